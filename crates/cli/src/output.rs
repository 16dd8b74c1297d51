use serde_json::{json, Value};
use starsift_core::models::{CleanReport, TriageSummary};
use starsift_core::pipeline::RunSummary;

pub fn run_json(summary: &RunSummary, min_rating: u8) -> Value {
    json!({
        "status": "ok",
        "min_rating": min_rating,
        "started_at": summary.started_at.to_rfc3339(),
        "finished_at": summary.finished_at.to_rfc3339(),
        "clean": clean_json(&summary.clean),
        "triage": triage_json(&summary.triage),
    })
}

pub fn dry_run_json(summary: &TriageSummary, min_rating: u8) -> Value {
    json!({
        "status": "dry_run",
        "min_rating": min_rating,
        "triage": triage_json(summary),
    })
}

pub fn declined_json(pending: usize) -> Value {
    json!({ "status": "declined", "pending": pending })
}

pub fn clean_json(report: &CleanReport) -> Value {
    json!({
        "removed": report.removed,
        "failures": report.failures,
    })
}

fn triage_json(summary: &TriageSummary) -> Value {
    json!({
        "visited": summary.visited,
        "copied": summary.copied,
        "below_threshold": summary.below_threshold,
        "unknown_rating": summary.unknown_rating,
        "excluded": summary.excluded,
        "bytes_copied": summary.bytes_copied,
        "copied_paths": summary.copied_paths,
    })
}

pub fn triage_line(label: &str, summary: &TriageSummary) -> String {
    let mut line = format!(
        "{}: visited {}, copied {} ({} bytes), below threshold {}",
        label, summary.visited, summary.copied, summary.bytes_copied, summary.below_threshold
    );
    if summary.unknown_rating > 0 {
        line.push_str(&format!(", unknown rating {}", summary.unknown_rating));
    }
    if summary.excluded > 0 {
        line.push_str(&format!(", excluded {}", summary.excluded));
    }
    line
}

pub fn clean_line(report: &CleanReport) -> String {
    format!(
        "clean: removed {}, failures {}",
        report.removed,
        report.failures.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triage_line_mentions_optional_counts_only_when_set() {
        let mut summary = TriageSummary {
            visited: 3,
            copied: 1,
            below_threshold: 2,
            bytes_copied: 42,
            ..TriageSummary::default()
        };
        assert_eq!(
            triage_line("run", &summary),
            "run: visited 3, copied 1 (42 bytes), below threshold 2"
        );
        summary.unknown_rating = 1;
        assert!(triage_line("run", &summary).ends_with(", unknown rating 1"));
    }

    #[test]
    fn dry_run_json_has_status() {
        let value = dry_run_json(&TriageSummary::default(), 4);
        assert_eq!(value["status"], "dry_run");
        assert_eq!(value["min_rating"], 4);
        assert_eq!(value["triage"]["copied"], 0);
    }
}
