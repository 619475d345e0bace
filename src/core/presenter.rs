use crate::domain::model::{ResultRow, SubmissionResult};
use serde_json::Value;
use std::fmt;
use url::Url;

/// Resolves a download locator against the service origin so it works outside this session.
pub fn resolve_link(base_url: &str, download_ref: &str) -> Result<Url, url::ParseError> {
    Url::parse(base_url)?.join(download_ref)
}

/// Column order as first seen across all rows.
pub fn column_order(rows: &[ResultRow]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for column in row.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
    }
    columns
}

pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Renderable result table; only exists for a non-empty result.
#[derive(Debug, Clone)]
pub struct ResultView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub download_link: Option<String>,
}

impl ResultView {
    pub fn build(result: &SubmissionResult, base_url: &str) -> Option<Self> {
        if result.is_empty() {
            return None;
        }

        let columns = column_order(&result.table);
        let rows = result
            .table
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| cell_text(row.get(column)))
                    .collect()
            })
            .collect();

        let download_link = result.download_ref.as_deref().and_then(|reference| {
            match resolve_link(base_url, reference) {
                Ok(url) => Some(url.to_string()),
                Err(e) => {
                    tracing::warn!("Unusable download locator '{}': {}", reference, e);
                    None
                }
            }
        });

        Some(Self {
            columns,
            rows,
            download_link,
        })
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(column.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ");
    writeln!(f, "{}", line.trim_end())
}

impl fmt::Display for ResultView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        write_line(f, &self.columns, &widths)?;
        let rule = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        writeln!(f, "{}", rule)?;
        for row in &self.rows {
            write_line(f, row, &widths)?;
        }
        if let Some(link) = &self.download_link {
            writeln!(f)?;
            writeln!(f, "Download output CSV: {}", link)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn row(value: Value) -> ResultRow {
        serde_json::from_value(value).unwrap()
    }

    fn result(table: Vec<ResultRow>, download: Option<&str>) -> SubmissionResult {
        SubmissionResult {
            table,
            download_ref: download.map(str::to_string),
            server_mail: None,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_one_line_per_row_and_resolved_link() {
        let result = result(
            vec![
                row(json!({"Alt": "A1", "rank": 1, "score": 0.82})),
                row(json!({"Alt": "A2", "rank": 2, "score": 0.41})),
            ],
            Some("/out/123.csv"),
        );

        let view = ResultView::build(&result, "http://localhost:5000").unwrap();
        assert_eq!(view.columns, vec!["Alt", "rank", "score"]);
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0], vec!["A1", "1", "0.82"]);
        assert_eq!(
            view.download_link.as_deref(),
            Some("http://localhost:5000/out/123.csv")
        );

        let text = view.to_string();
        assert!(text.starts_with("Alt | rank | score"));
        assert!(text.contains("A2  | 2    | 0.41"));
        assert!(text.contains("Download output CSV: http://localhost:5000/out/123.csv"));
    }

    #[test]
    fn test_empty_table_renders_nothing() {
        assert!(ResultView::build(&result(Vec::new(), Some("/out/1.csv")), "http://x.io").is_none());
    }

    #[test]
    fn test_heterogeneous_rows() {
        let result = result(
            vec![
                row(json!({"Alt": "A1", "score": 0.5})),
                row(json!({"Alt": "A2", "Rank": 1, "note": null, "tags": ["x"]})),
            ],
            None,
        );

        let view = ResultView::build(&result, "http://x.io").unwrap();
        assert_eq!(view.columns, vec!["Alt", "score", "Rank", "note", "tags"]);
        assert_eq!(view.rows[0], vec!["A1", "0.5", "", "", ""]);
        assert_eq!(view.rows[1], vec!["A2", "", "1", "", "[\"x\"]"]);
        assert!(view.download_link.is_none());
        assert!(!view.to_string().contains("Download"));
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link("https://topsis.example.com/app/", "/api/download/r.csv")
                .unwrap()
                .as_str(),
            "https://topsis.example.com/api/download/r.csv"
        );
        assert_eq!(
            resolve_link("https://topsis.example.com", "https://cdn.example.com/r.csv")
                .unwrap()
                .as_str(),
            "https://cdn.example.com/r.csv"
        );
        assert!(resolve_link("not a url", "/r.csv").is_err());
    }
}
