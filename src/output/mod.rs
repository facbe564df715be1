use crate::detect::{Detection, DetectionResult, ProbeStatus};

/// Print the report as pretty JSON.
pub fn render_json(report: &Detection) {
    let output = serde_json::to_string_pretty(report).unwrap_or_default();
    println!("{}", output);
}

/// Print the report as a terminal table.
pub fn render_table(report: &Detection, verbose: bool) {
    let divider = "=".repeat(64);
    let thin_div = "-".repeat(64);

    println!();
    println!("{}", divider);
    println!("  VPN Detection for {}", display_or(&report.client_ip, "(empty)"));
    println!("{}", divider);
    println!();
    println!("  {} {}", verdict_marker(report.verdict), report.message);

    if report.verdict == DetectionResult::InvalidInput {
        println!();
        println!("{}", divider);
        return;
    }

    println!();
    println!("{}", thin_div);
    println!("  Evidence");
    println!("{}", thin_div);
    println!("  {:<20} {}", "Leak probe", probe_label(report.probe));
    println!(
        "  {:<20} {}",
        "Leaked IP",
        report.leaked_ip.as_deref().unwrap_or("none")
    );
    println!(
        "  {:<20} {}",
        "Deciding provider",
        report.provider.as_deref().unwrap_or("none")
    );

    if let Some(ref record) = report.record {
        println!(
            "  {:<20} {}",
            "Organization",
            display_or(record.organization.as_deref().unwrap_or_default(), "-")
        );
        println!(
            "  {:<20} {}",
            "ISP",
            display_or(record.isp.as_deref().unwrap_or_default(), "-")
        );
    }

    if let Some(ref note) = report.note {
        println!("  {:<20} {}", "Note", note);
    }

    if verbose {
        println!("  {:<20} {}", "Checked at", report.checked_at.to_rfc3339());
    }

    println!("{}", divider);
}

fn verdict_marker(verdict: DetectionResult) -> &'static str {
    match verdict {
        DetectionResult::VpnDetected => "[!]",
        DetectionResult::NotVpn => "[+]",
        DetectionResult::InvalidInput => "[x]",
        DetectionResult::Unknown | DetectionResult::ProbeUnsupported => "[?]",
    }
}

fn probe_label(status: ProbeStatus) -> &'static str {
    match status {
        ProbeStatus::NotRun => "not run",
        ProbeStatus::Unavailable => "unavailable",
        ProbeStatus::NoAddress => "no reflexive address",
        ProbeStatus::Rejected => "non-public address ignored",
        ProbeStatus::Matched => "matches client ip",
        ProbeStatus::Mismatched => "differs from client ip",
    }
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}
