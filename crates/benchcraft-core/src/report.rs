use std::collections::BTreeMap;
use std::path::Path;

use benchcraft_types::{cell_id, summarize, GridCell, ResultGrid, ResultRecord};
use serde_json::json;

use crate::artifact;
use crate::error::{BenchError, Result};

/// Load `<output_dir>/<name>` and render it as an HTML page.
///
/// `name` must be a bare file name; anything that could walk out of
/// `output_dir` is rejected as a configuration error.
pub async fn render_artifact_page(output_dir: &Path, name: &str) -> Result<String> {
    if !is_plain_file_name(name) {
        return Err(BenchError::InvalidConfig(format!("'{name}' is not a report file name")));
    }
    let records = artifact::read_records(&output_dir.join(name)).await?;
    Ok(generate_html_report(&records))
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

pub fn generate_html_report(records: &[ResultRecord]) -> String {
    let summaries = summarize(records);
    let grid = ResultGrid::from_records(records);

    let mut summary_rows = String::new();
    for s in &summaries {
        let accuracy = s.accuracy();
        summary_rows.push_str(&format!(
            r#"
                <tr>
                    <td>{}</td>
                    <td>
                        {}/{} ({:.1}%)
                        <div class="summary-bar"><div class="summary-bar-fill" style="width: {:.1}%;"></div></div>
                    </td>
                    <td>{:.2}s</td>
                </tr>"#,
            html_escape(&s.model),
            s.correct,
            s.total,
            accuracy,
            accuracy,
            s.avg_response_time()
        ));
    }

    let mut grid_header = String::new();
    for file in &grid.files {
        grid_header.push_str(&format!("<th>{}</th>", html_escape(file)));
    }

    let mut grid_rows = String::new();
    for (model, row) in grid.models.iter().zip(&grid.cells) {
        grid_rows.push_str(&format!("<tr><td class=\"model-name\">{}</td>", html_escape(model)));
        for (file, cell) in grid.files.iter().zip(row) {
            match cell {
                Some(c) => {
                    let id = html_escape(&cell_id(model, file));
                    grid_rows.push_str(&format!(
                        r#"<td class="cell" style="background-color: {};" data-cell-id="{}" onclick="showOverlay(this.dataset.cellId)"><div class="cell-time">{:.2}s</div></td>"#,
                        cell_color(c),
                        id,
                        c.response_time
                    ));
                }
                None => grid_rows.push_str(r#"<td class="cell unavailable">unavailable</td>"#),
            }
        }
        grid_rows.push_str("</tr>\n");
    }

    let mut by_file: BTreeMap<&str, Vec<&ResultRecord>> = BTreeMap::new();
    for r in records {
        by_file.entry(r.file.as_str()).or_default().push(r);
    }

    let mut questions = String::new();
    for (file, answers) in &by_file {
        // prompt and expected answer are the same for every model
        let first = answers[0];
        let mut answers_html = String::new();
        for r in answers {
            let (class, marker) = match r.correct {
                Some(true) => ("correct", "✓"),
                Some(false) => ("incorrect", "✗"),
                None => ("pending", "…"),
            };
            answers_html.push_str(&format!(
                r#"
                    <div class="model-answer {}">
                        <h4>{} {}</h4>
                        <p><strong>Generated Answer:</strong></p>
                        <pre>{}</pre>
                        <p><em>Response Time: {:.2}s</em></p>
                    </div>"#,
                class,
                marker,
                html_escape(&r.model),
                html_escape(&r.generated),
                r.response_time
            ));
        }
        questions.push_str(&format!(
            r#"
            <div class="question">
                <div class="question-header" onclick="toggleDetails(this)">&#9654; {}</div>
                <div class="models-container" style="display: none;">
                    <p><strong>Prompt:</strong></p>
                    <pre>{}</pre>
                    <p><strong>Expected Answer:</strong></p>
                    <pre>{}</pre>
                    <hr>{}
                </div>
            </div>"#,
            html_escape(file),
            html_escape(&first.prompt),
            html_escape(&first.expected),
            answers_html
        ));
    }

    let total = records.len();
    let correct = records.iter().filter(|r| r.is_correct()).count();
    let overall = if total == 0 { 0.0 } else { correct as f64 / total as f64 * 100.0 };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Benchcraft Report</title>
    <style>
        * {{ box-sizing: border-box; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
        }}
        .container {{
            max-width: 1400px;
            margin: 0 auto;
            background: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }}
        h1 {{ margin: 0 0 10px 0; color: #333; }}
        h2 {{ margin-top: 30px; color: #333; }}
        .timestamp {{ color: #6c757d; font-size: 14px; margin-bottom: 20px; }}
        table {{ width: 100%; border-collapse: collapse; margin-top: 10px; }}
        th {{
            background: #343a40;
            color: white;
            padding: 10px;
            text-align: left;
            font-weight: 600;
            font-size: 13px;
        }}
        td {{ padding: 10px; border-bottom: 1px solid #dee2e6; vertical-align: middle; }}
        .summary-bar {{ height: 6px; background: #f8d7da; border-radius: 3px; margin-top: 6px; }}
        .summary-bar-fill {{ height: 6px; background: #28a745; border-radius: 3px; }}
        .grid-wrapper {{ overflow-x: auto; }}
        .model-name {{ font-weight: 600; white-space: nowrap; }}
        .cell {{ cursor: pointer; min-width: 70px; text-align: center; }}
        .cell-time {{ font-weight: bold; font-size: 0.9em; }}
        .cell.unavailable {{ background: #d0d0d0; color: #6c757d; cursor: default; font-size: 0.8em; }}
        .question {{ border: 1px solid #dee2e6; border-radius: 6px; margin-bottom: 10px; }}
        .question-header {{ padding: 12px; cursor: pointer; font-weight: 600; background: #f8f9fa; }}
        .models-container {{ padding: 12px; }}
        .model-answer {{ padding: 10px; margin: 10px 0; border-radius: 4px; border-left: 4px solid #adb5bd; }}
        .model-answer.correct {{ background: #f0f9f4; border-left-color: #28a745; }}
        .model-answer.incorrect {{ background: #fef3f2; border-left-color: #dc3545; }}
        .model-answer.pending {{ background: #eef3f9; }}
        .model-answer h4 {{ margin: 0 0 6px 0; }}
        pre {{
            margin: 0;
            padding: 8px;
            background: #f8f9fa;
            border-radius: 4px;
            font-size: 12px;
            max-height: 300px;
            overflow: auto;
            white-space: pre-wrap;
            word-break: break-word;
        }}
        #overlay {{
            display: none;
            position: fixed;
            inset: 0;
            background: rgba(0,0,0,0.5);
            align-items: center;
            justify-content: center;
        }}
        #overlay-content {{
            background: white;
            padding: 20px;
            border-radius: 8px;
            max-width: 800px;
            max-height: 80vh;
            overflow: auto;
        }}
    </style>
    <script>
        const cellData = {};

        function toggleDetails(header) {{
            const body = header.nextElementSibling;
            const open = body.style.display === 'none';
            body.style.display = open ? 'block' : 'none';
            header.textContent = (open ? '\u25BC ' : '\u25B6 ') + header.textContent.slice(2);
        }}

        function showOverlay(id) {{
            const data = cellData[id];
            if (!data) {{ return; }}
            const verdict = data.correct === null ? 'not evaluated' : (data.correct ? 'correct' : 'incorrect');
            document.getElementById('overlay-title').textContent = data.model + ' / ' + data.file;
            document.getElementById('overlay-meta').textContent = data.response_time.toFixed(2) + 's, ' + verdict;
            document.getElementById('overlay-answer').textContent = data.generated;
            document.getElementById('overlay').style.display = 'flex';
        }}

        function hideOverlay() {{
            document.getElementById('overlay').style.display = 'none';
        }}
    </script>
</head>
<body>
    <div class="container">
        <h1>Benchcraft Report</h1>
        <div class="timestamp">Generated: {} | {} answers, {} correct ({:.1}%)</div>

        <h2>Model Performance Summary</h2>
        <table>
            <thead>
                <tr><th>Model</th><th>Correct</th><th>Avg Response Time</th></tr>
            </thead>
            <tbody>{}
            </tbody>
        </table>

        <h2>Detailed Results</h2>
        <div class="grid-wrapper">
            <table>
                <thead>
                    <tr><th>Model</th>{}</tr>
                </thead>
                <tbody>
{}                </tbody>
            </table>
        </div>

        <h2>Questions</h2>{}
    </div>
    <div id="overlay" onclick="hideOverlay()">
        <div id="overlay-content" onclick="event.stopPropagation()">
            <h3 id="overlay-title"></h3>
            <p><em id="overlay-meta"></em></p>
            <pre id="overlay-answer"></pre>
        </div>
    </div>
</body>
</html>"#,
        cell_data_json(records),
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        total,
        correct,
        overall,
        summary_rows,
        grid_header,
        grid_rows,
        questions
    )
}

/// Background colour for a grid cell: green for correct, red for incorrect,
/// lighter the slower the answer.
fn cell_color(cell: &GridCell) -> String {
    let n = cell.normalized_time.clamp(0.0, 1.0);
    match cell.correct {
        Some(true) => {
            let (fast, slow) = ((0.0, 247.0, 0.0), (245.0, 255.0, 245.0));
            let lerp = |a: f64, b: f64| (a + (b - a) * n) as u8;
            format!(
                "rgb({}, {}, {})",
                lerp(fast.0, slow.0),
                lerp(fast.1, slow.1),
                lerp(fast.2, slow.2)
            )
        }
        Some(false) => format!("hsl(0, 100%, {}%)", (70.0 + 30.0 * n) as u8),
        None => "#dbe4f0".to_string(),
    }
}

/// Per-cell data for the click overlay, safe to inline in a `<script>` block.
fn cell_data_json(records: &[ResultRecord]) -> String {
    let mut data = serde_json::Map::new();
    for r in records {
        data.entry(r.cell_id()).or_insert_with(|| {
            json!({
                "model": r.model,
                "file": r.file,
                "generated": r.generated,
                "response_time": r.response_time,
                "correct": r.correct,
            })
        });
    }
    serde_json::Value::Object(data)
        .to_string()
        .replace("</", "<\\/")
        .replace("<!--", "<\\!--")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str, file: &str, time: f64, correct: Option<bool>) -> ResultRecord {
        ResultRecord {
            model: model.to_string(),
            file: file.to_string(),
            prompt: format!("Prompt <{file}>"),
            response_time: time,
            expected: "Paris & Lyon".to_string(),
            generated: format!("{model} answer"),
            correct,
            evaluator_model: correct.map(|_| "judge".to_string()),
        }
    }

    #[test]
    fn test_html_contains_summary_and_grid() {
        let records = vec![
            record("m1", "a.txt", 1.0, Some(true)),
            record("m1", "b.txt", 3.0, Some(false)),
            record("m2", "a.txt", 2.0, Some(true)),
        ];
        let html = generate_html_report(&records);

        assert!(html.contains("1/2 (50.0%)"));
        assert!(html.contains("1/1 (100.0%)"));
        assert!(html.contains("2.00s"));
        assert!(html.contains("<th>a.txt</th><th>b.txt</th>"));
        // m2 has no answer for b.txt
        assert_eq!(html.matches(">unavailable</td>").count(), 1);
        assert!(html.contains("rgb(0, 247, 0)"));
        assert!(html.contains("hsl(0, 100%, 100%)"));
        assert!(html.contains(r#"data-cell-id="m1/b.txt""#));
    }

    #[test]
    fn test_cell_ids_stay_distinct_for_dashed_names() {
        let records = vec![
            record("a-b", "c.txt", 1.0, Some(true)),
            record("a", "b-c.txt", 2.0, Some(false)),
        ];
        let html = generate_html_report(&records);

        assert!(html.contains(r#"data-cell-id="a-b/c.txt""#));
        assert!(html.contains(r#"data-cell-id="a/b-c.txt""#));
        assert!(html.contains(r#""a-b/c.txt":"#));
        assert!(html.contains(r#""a/b-c.txt":"#));
        assert!(html.contains("a-b answer"));
    }

    #[test]
    fn test_html_escapes_user_text() {
        let mut r = record("m1", "a.txt", 1.0, Some(true));
        r.generated = "</script><b>bold</b>".to_string();
        let html = generate_html_report(&[r]);

        assert!(html.contains("Prompt &lt;a.txt&gt;"));
        assert!(html.contains("Paris &amp; Lyon"));
        assert!(html.contains("&lt;/script&gt;&lt;b&gt;bold&lt;/b&gt;"));
        assert!(!html.contains("</script><b>"));
        assert!(html.contains(r#"<\/script>"#));
    }

    #[test]
    fn test_empty_report_renders() {
        let html = generate_html_report(&[]);
        assert!(html.contains("0 answers, 0 correct (0.0%)"));
        assert!(html.contains("const cellData = {};"));
    }

    #[test]
    fn test_cell_colors() {
        let cell = |correct, n| GridCell { correct, response_time: 1.0, normalized_time: n };
        assert_eq!(cell_color(&cell(Some(true), 0.0)), "rgb(0, 247, 0)");
        assert_eq!(cell_color(&cell(Some(true), 1.0)), "rgb(245, 255, 245)");
        assert_eq!(cell_color(&cell(Some(false), 0.0)), "hsl(0, 100%, 70%)");
        assert_eq!(cell_color(&cell(Some(false), 0.5)), "hsl(0, 100%, 85%)");
        assert_eq!(cell_color(&cell(None, 0.5)), "#dbe4f0");
    }

    #[test]
    fn test_pending_records_are_marked() {
        let html = generate_html_report(&[record("m1", "a.txt", 1.0, None)]);
        assert!(html.contains("model-answer pending"));
        assert!(html.contains("0/1 (0.0%)"));
    }

    #[tokio::test]
    async fn test_render_artifact_page() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record("m1", "a.txt", 1.0, Some(true))];
        artifact::write_records(&dir.path().join("report-evaluated.json"), &records)
            .await
            .unwrap();

        let html = render_artifact_page(dir.path(), "report-evaluated.json").await.unwrap();
        assert!(html.contains("1/1 (100.0%)"));

        let missing = render_artifact_page(dir.path(), "other.json").await.unwrap_err();
        assert!(missing.is_not_found());

        for bad in ["../report-evaluated.json", "sub/report.json", "..", ""] {
            let err = render_artifact_page(dir.path(), bad).await.unwrap_err();
            assert!(matches!(err, BenchError::InvalidConfig(_)), "{bad} was accepted");
        }
    }
}
