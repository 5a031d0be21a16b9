use anyhow::Result;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::core::common::{RunSummary, SummaryFormat};

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Hostnames")]
    hostnames: usize,
    #[tabled(rename = "Skipped")]
    skipped: usize,
    #[tabled(rename = "Status")]
    status: String,
}

pub fn pipeline_start_msg(sources: usize, consumers: usize, capacity: usize, output: &str) -> String {
    format!("Resolving hostnames from {sources} file(s) with {consumers} resolver(s), queue size {capacity} => {output}")
}

/// Render the run summary in the requested format.
pub fn summary_msg(summary: &RunSummary, format: SummaryFormat) -> Result<String> {
    match format {
        SummaryFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        SummaryFormat::Table => Ok(summary_table_msg(summary)),
    }
}

fn summary_table_msg(summary: &RunSummary) -> String {
    let rows: Vec<SourceRow> = summary
        .sources
        .iter()
        .map(|s| SourceRow {
            source: s.source.to_owned(),
            hostnames: s.hostnames,
            skipped: s.skipped,
            status: match &s.error {
                Some(e) => e.to_owned(),
                None => "ok".to_owned(),
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());

    format!(
        "\n{table}\n{} resolved, {} failed, {} written in {:.3}ms (run {})",
        summary.resolved, summary.failed, summary.written, summary.elapsed_ms, summary.run_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::common::SourceReport;

    fn summary() -> RunSummary {
        RunSummary {
            run_id: "run-1".to_owned(),
            started_utc: "2024-01-01T00:00:00Z".to_owned(),
            elapsed_ms: 1.5,
            consumers: 2,
            queue_capacity: 2,
            sources: vec![
                SourceReport {
                    source: "names1.txt".to_owned(),
                    hostnames: 2,
                    skipped: 0,
                    error: None,
                },
                SourceReport {
                    source: "missing.txt".to_owned(),
                    hostnames: 0,
                    skipped: 0,
                    error: Some("Error Opening Input File: missing.txt".to_owned()),
                },
            ],
            resolved: 1,
            failed: 1,
            written: 2,
            write_errors: 0,
        }
    }

    #[test]
    fn table_lists_every_source() {
        let msg = summary_msg(&summary(), SummaryFormat::Table).unwrap();
        assert!(msg.contains("names1.txt"));
        assert!(msg.contains("Error Opening Input File: missing.txt"));
        assert!(msg.contains("1 resolved, 1 failed, 2 written"));
    }

    #[test]
    fn json_summary_is_parseable() {
        let msg = summary_msg(&summary(), SummaryFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["written"], 2);
        assert_eq!(value["sources"][1]["error"], "Error Opening Input File: missing.txt");
        assert_eq!(value["sources"][0]["error"], serde_json::Value::Null);
    }

    #[test]
    fn start_msg_mentions_output() {
        let msg = pipeline_start_msg(2, 4, 10, "out.txt");
        assert!(msg.contains("2 file(s)"));
        assert!(msg.ends_with("=> out.txt"));
    }
}
