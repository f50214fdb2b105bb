use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tabled::Tabled;

/// One model's answer to one prompt file.
///
/// `correct` and `evaluator_model` stay `None` until the evaluate stage runs,
/// and are left out of the raw report JSON entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
	pub model: String,
	pub file: String,
	pub prompt: String,
	/// Seconds spent waiting on the completion endpoint.
	pub response_time: f64,
	pub expected: String,
	pub generated: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub correct: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub evaluator_model: Option<String>,
}

impl ResultRecord {
	pub fn is_correct(&self) -> bool {
		self.correct == Some(true)
	}

	/// Key shared by the HTML grid cell and its overlay data.
	pub fn cell_id(&self) -> String {
		cell_id(&self.model, &self.file)
	}
}

/// `file` is a bare file name and never holds a `/`, so the last `/` always
/// splits the key back into model and file.
pub fn cell_id(model: &str, file: &str) -> String {
	format!("{model}/{file}")
}

/// Per-model aggregate, recomputed on every render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
	pub model: String,
	pub total: usize,
	pub correct: usize,
	pub total_time: f64,
}

impl ModelSummary {
	/// Percentage of correct answers, 0 when the model has no records.
	pub fn accuracy(&self) -> f64 {
		if self.total == 0 { 0.0 } else { self.correct as f64 / self.total as f64 * 100.0 }
	}

	pub fn avg_response_time(&self) -> f64 {
		if self.total == 0 { 0.0 } else { self.total_time / self.total as f64 }
	}
}

/// Aggregate records per model, sorted by model name.
pub fn summarize(records: &[ResultRecord]) -> Vec<ModelSummary> {
	let mut by_model: BTreeMap<&str, ModelSummary> = BTreeMap::new();
	for r in records {
		let entry = by_model.entry(r.model.as_str()).or_insert_with(|| ModelSummary {
			model: r.model.clone(),
			..ModelSummary::default()
		});
		entry.total += 1;
		if r.is_correct() {
			entry.correct += 1;
		}
		entry.total_time += r.response_time;
	}
	by_model.into_values().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
	pub correct: Option<bool>,
	pub response_time: f64,
	/// Position of `response_time` between the fastest (0.0) and slowest (1.0) record.
	pub normalized_time: f64,
}

/// Model × prompt-file matrix.
///
/// The shape is always `models.len() × files.len()`; a combination without
/// a record is a `None` cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultGrid {
	pub models: Vec<String>,
	pub files: Vec<String>,
	pub cells: Vec<Vec<Option<GridCell>>>,
}

impl ResultGrid {
	pub fn from_records(records: &[ResultRecord]) -> Self {
		let models: Vec<String> = records
			.iter()
			.map(|r| r.model.clone())
			.collect::<BTreeSet<_>>()
			.into_iter()
			.collect();
		let files: Vec<String> = records
			.iter()
			.map(|r| r.file.clone())
			.collect::<BTreeSet<_>>()
			.into_iter()
			.collect();

		let min_time = records.iter().map(|r| r.response_time).fold(f64::INFINITY, f64::min);
		let max_time = records.iter().map(|r| r.response_time).fold(f64::NEG_INFINITY, f64::max);
		let range = if max_time > min_time { max_time - min_time } else { 1.0 };

		let mut lookup: BTreeMap<(&str, &str), &ResultRecord> = BTreeMap::new();
		for r in records {
			// first record wins if a pair was duplicated by hand
			lookup.entry((r.model.as_str(), r.file.as_str())).or_insert(r);
		}

		let cells = models
			.iter()
			.map(|model| {
				files
					.iter()
					.map(|file| {
						lookup.get(&(model.as_str(), file.as_str())).map(|r| GridCell {
							correct: r.correct,
							response_time: r.response_time,
							normalized_time: (r.response_time - min_time) / range,
						})
					})
					.collect()
			})
			.collect();

		Self { models, files, cells }
	}

	pub fn cell(&self, model: &str, file: &str) -> Option<&GridCell> {
		let row = self.models.iter().position(|m| m == model)?;
		let col = self.files.iter().position(|f| f == file)?;
		self.cells[row][col].as_ref()
	}
}

#[derive(Debug, Clone, Tabled)]
struct DetailRow {
	#[tabled(rename = "Model")]
	model: String,
	#[tabled(rename = "File")]
	file: String,
	#[tabled(rename = "Correct")]
	correct: String,
	#[tabled(rename = "Response Time")]
	response_time: String,
}

#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
	#[tabled(rename = "Model")]
	model: String,
	#[tabled(rename = "Correct")]
	correct: String,
	#[tabled(rename = "Avg Response Time")]
	avg_time: String,
}

/// One line per record.
pub fn detailed_table(records: &[ResultRecord]) -> String {
	let rows: Vec<DetailRow> = records.iter().map(|r| DetailRow {
		model: r.model.clone(),
		file: r.file.clone(),
		correct: match r.correct {
			Some(true) => "Yes".to_string(),
			Some(false) => "No".to_string(),
			None => "-".to_string(),
		},
		response_time: format!("{:.2}s", r.response_time),
	}).collect();

	tabled::Table::new(rows).to_string()
}

/// The model × file grid as text; missing combinations show `-`.
pub fn grid_table(grid: &ResultGrid) -> String {
	let mut builder = tabled::builder::Builder::default();

	let mut header = vec!["Model".to_string()];
	header.extend(grid.files.iter().cloned());
	builder.push_record(header);

	for (model, row) in grid.models.iter().zip(&grid.cells) {
		let mut line = vec![model.clone()];
		line.extend(row.iter().map(|cell| match cell {
			Some(c) => {
				let mark = match c.correct {
					Some(true) => "✓",
					Some(false) => "✗",
					None => "…",
				};
				format!("{} {:.2}s", mark, c.response_time)
			}
			None => "-".to_string(),
		}));
		builder.push_record(line);
	}

	builder.build().to_string()
}

pub fn summary_table(summaries: &[ModelSummary]) -> String {
	let rows: Vec<SummaryRow> = summaries.iter().map(|s| SummaryRow {
		model: s.model.clone(),
		correct: format!("{}/{} ({:.1}%)", s.correct, s.total, s.accuracy()),
		avg_time: format!("{:.2}s", s.avg_response_time()),
	}).collect();

	tabled::Table::new(rows).to_string()
}

/// All three console tables, headed the way the run output prints them.
pub fn console_report(records: &[ResultRecord]) -> String {
	let grid = ResultGrid::from_records(records);
	let summaries = summarize(records);
	format!(
		"Detailed Results\n{}\n\nResults Grid\n{}\n\nModel Performance Summary\n{}\n",
		detailed_table(records),
		grid_table(&grid),
		summary_table(&summaries)
	)
}
