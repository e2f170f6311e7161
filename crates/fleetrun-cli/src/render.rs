//! Text presentation of a run report

use fleetrun_core::RunReport;

const RULE_WIDTH: usize = 80;
const RECORD_PREVIEW: usize = 100;

/// Print the per-host results and the closing summary
pub fn print_report(report: &RunReport) {
    println!();
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("RESULTS");
    println!("{}", "=".repeat(RULE_WIDTH));

    for host in &report.hosts {
        let verdict = if host.success { "SUCCESS" } else { "FAILED" };
        println!("\n{}: {verdict}", host.host);

        if let Some(error) = &host.error {
            println!("  error: {error}");
        }

        for cmd in &host.commands {
            let record = preview(&cmd.parsed.to_string());
            if cmd.success {
                println!("  {}: {record}", cmd.command);
            } else {
                println!("  {} (exit {}): {record}", cmd.command, cmd.exit_code);
            }
        }
    }

    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!(
        "Summary: {}/{} hosts successful",
        report.successful_hosts, report.total_hosts
    );
}

fn preview(record: &str) -> String {
    if record.chars().count() <= RECORD_PREVIEW {
        record.to_string()
    } else {
        let truncated: String = record.chars().take(RECORD_PREVIEW).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn test_preview_truncates_long_records() {
        let short = preview("short");
        assert_eq!(short, "short");

        let long = preview(&"x".repeat(150));
        assert_eq!(long.chars().count(), 103);
        assert!(long.ends_with("..."));
    }
}
