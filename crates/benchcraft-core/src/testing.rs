//! Stand-ins for the completion endpoint, for tests that should not touch the network.

use std::time::Duration;

use async_trait::async_trait;

use crate::client::{Completer, Completion};
use crate::error::Result;

/// A `Completer` answering from a closure over `(model, user_prompt, system_prompt)`.
pub struct FnCompleter<F> {
    f: F,
    elapsed: Duration,
}

/// Wrap a closure as a `Completer`. Every completion reports 250ms unless
/// changed with [`FnCompleter::elapsed`].
///
/// # Example
/// ```ignore
/// let completer = Arc::new(completer_fn(|model, prompt, _| {
///     Ok(format!("{model} says {prompt}"))
/// }));
/// ```
pub fn completer_fn<F>(f: F) -> FnCompleter<F>
where
    F: Fn(&str, &str, Option<&str>) -> Result<String> + Send + Sync + 'static,
{
    FnCompleter {
        f,
        elapsed: Duration::from_millis(250),
    }
}

impl<F> FnCompleter<F> {
    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

#[async_trait]
impl<F> Completer for FnCompleter<F>
where
    F: Fn(&str, &str, Option<&str>) -> Result<String> + Send + Sync + 'static,
{
    async fn complete(&self, model: &str, user_prompt: &str, system_prompt: Option<&str>) -> Result<Completion> {
        let text = (self.f)(model, user_prompt, system_prompt)?;
        Ok(Completion {
            text,
            elapsed: self.elapsed,
        })
    }
}
