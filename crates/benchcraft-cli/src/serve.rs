use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use benchcraft_core::config::EVALUATED_REPORT_FILE;
use benchcraft_core::report::render_artifact_page;
use benchcraft_core::BenchError;
use serde::Deserialize;
use tracing::{error, info, warn};

struct ServeState {
    output_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RenderQuery {
    render: Option<String>,
}

pub fn router(output_dir: PathBuf) -> Router {
    Router::new()
        .route("/", get(report_page))
        .with_state(Arc::new(ServeState { output_dir }))
}

pub async fn serve(output_dir: PathBuf, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        "Serving reports from {} at http://{}/",
        output_dir.display(),
        listener.local_addr()?
    );
    axum::serve(listener, router(output_dir)).await?;
    Ok(())
}

async fn report_page(
    State(state): State<Arc<ServeState>>,
    Query(query): Query<RenderQuery>,
) -> Response {
    let Some(name) = query.render.filter(|name| !name.trim().is_empty()) else {
        let location = format!("/?render={EVALUATED_REPORT_FILE}");
        return (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response();
    };

    match render_artifact_page(&state.output_dir, &name).await {
        Ok(page) => Html(page).into_response(),
        Err(err @ BenchError::InvalidConfig(_)) => {
            warn!(render = %name, "{err}");
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(err) if err.is_not_found() => (
            StatusCode::NOT_FOUND,
            "Report file not found. Please run the evaluation first.",
        )
            .into_response(),
        Err(err) => {
            error!(render = %name, "{err}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("An error occurred: {err}")).into_response()
        }
    }
}
