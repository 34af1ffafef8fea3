//! Text and JSON rendering of a pipeline run.
//!
//! Used by the console entry point to show what was computed and written.

use crate::models::ClientEntry;
use crate::pipeline::PipelineOutcome;
use anyhow::Result;

/// Generate a plain-text report of a run.
pub fn generate_text_report(outcome: &PipelineOutcome) -> String {
    let mut output = String::new();
    let summary = &outcome.report.summary;

    output.push_str(&format!("Generation report for {}\n", outcome.target_date));
    if outcome.selected_area.is_empty() {
        output.push_str("Area: (none selected)\n");
    } else {
        output.push_str(&format!("Area: {}\n", outcome.selected_area));
    }
    output.push_str(&format!(
        "Rows read: {} (header included)\n\n",
        outcome.rows_read
    ));

    output.push_str(&format!("  Records:            {}\n", summary.count));
    output.push_str(&format!("  Average unit/kW:    {}\n", summary.average));
    output.push_str(&format!("  Area average:       {}\n", summary.area_average));
    output.push('\n');

    output.push_str(&generate_client_section("Area clients", &outcome.report.area_matches));
    output.push_str(&generate_client_section(
        "Cleaning done",
        &outcome.report.cleaning_done,
    ));

    if outcome.written {
        output.push_str("Results written to the tracking sheet.\n");
    } else {
        output.push_str("Dry run: nothing written.\n");
    }

    output
}

fn generate_client_section(title: &str, clients: &[ClientEntry]) -> String {
    let mut section = format!("{} ({}):\n", title, clients.len());

    if clients.is_empty() {
        section.push_str("  (none)\n");
    }
    for client in clients {
        section.push_str(&format!("  - {}: {}\n", client.name, client.unit_per_kw));
    }
    section.push('\n');

    section
}

/// Generate a JSON report of a run.
pub fn generate_json_report(outcome: &PipelineOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}
