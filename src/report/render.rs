//! Human-readable report rendering

use colored::{ColoredString, Colorize};

use super::{DeviceOutcome, SyncReport};
use crate::config::ReportOptions;
use crate::engine::KindOutcome;

const RULE_WIDTH: usize = 60;
const TITLE: &str = "DEVICE COMPONENT SYNCHRONIZATION REPORT";

struct Painter {
    color: bool,
}

impl Painter {
    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Render a report as text
///
/// Only devices with changes or errors are listed unless
/// `full_listing` is set.
pub fn render_text(report: &SyncReport, options: &ReportOptions) -> String {
    let painter = Painter {
        color: options.color,
    };
    let mut out = String::new();

    render_header(&mut out, report, &painter);
    render_totals(&mut out, report, &painter);
    render_devices(&mut out, report, options, &painter);
    render_errors(&mut out, report, &painter);

    out
}

fn render_header(out: &mut String, report: &SyncReport, painter: &Painter) {
    let rule = "=".repeat(RULE_WIDTH);
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("{}\n", painter.paint(TITLE, |s| s.bold())));
    out.push_str(&format!("{rule}\n"));

    let kinds: Vec<&str> = report.kinds.iter().map(|kind| kind.label()).collect();
    let elapsed = report.finished_at - report.started_at;

    out.push_str(&format!("Mode:     {}\n", report.mode));
    out.push_str(&format!("Kinds:    {}\n", kinds.join(", ")));
    out.push_str(&format!(
        "Started:  {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Duration: {}.{:03}s\n",
        elapsed.num_seconds(),
        elapsed.num_milliseconds() % 1000
    ));

    let failed = report.failed.to_string();
    let failed = if report.failed > 0 {
        painter.paint(&failed, |s| s.red())
    } else {
        failed
    };
    out.push_str(&format!(
        "Devices:  {} processed, {} succeeded, {failed} failed, {} with changes\n",
        report.processed, report.succeeded, report.devices_with_changes
    ));

    if let Some(reason) = &report.cancelled {
        let line = format!("Cancelled: {reason}; {} device(s) not started", report.skipped);
        out.push_str(&format!("{}\n", painter.paint(&line, |s| s.yellow())));
    }
}

fn render_totals(out: &mut String, report: &SyncReport, painter: &Painter) {
    out.push('\n');
    let header = format!(
        "{:<22}{:>7}{:>9}{:>11}{:>8}{:>10}{:>10}{:>9}",
        "Kind", "Added", "Removed", "Protected", "Forced", "Pend.Add", "Pend.Rem", "Drifted"
    );
    out.push_str(&format!("{}\n", painter.paint(&header, |s| s.bold())));
    out.push_str(&format!("{}\n", "-".repeat(header.len())));

    for (kind, totals) in &report.totals {
        out.push_str(&format!(
            "{:<22}{:>7}{:>9}{:>11}{:>8}{:>10}{:>10}{:>9}\n",
            kind.display_name(),
            totals.added,
            totals.removed,
            totals.protected,
            totals.forced,
            totals.pending_add,
            totals.pending_remove,
            totals.drifted
        ));
    }
}

fn render_devices(
    out: &mut String,
    report: &SyncReport,
    options: &ReportOptions,
    painter: &Painter,
) {
    let listed: Vec<&DeviceOutcome> = report
        .devices
        .iter()
        .filter(|device| {
            options.full_listing || !device.is_success() || device.has_changes(report.mode)
        })
        .collect();

    if listed.is_empty() {
        return;
    }

    out.push('\n');
    let title = if options.full_listing {
        "Devices"
    } else {
        "Devices with changes or errors"
    };
    out.push_str(&format!("{}\n", painter.paint(title, |s| s.cyan().bold())));

    let limit = (!options.full_listing).then_some(options.list_limit);

    for device in listed {
        let type_suffix = device
            .device_type
            .as_deref()
            .map(|t| format!(" ({t})"))
            .unwrap_or_default();

        if let Some(error) = &device.error {
            out.push_str(&format!(
                "  {} {}{type_suffix}: {}\n",
                painter.paint("✗", |s| s.red()),
                device.device,
                error.error
            ));
            continue;
        }

        let symbol = if device.has_changes(report.mode) {
            painter.paint("✓", |s| s.green())
        } else {
            painter.paint("○", |s| s.dimmed())
        };
        out.push_str(&format!("  {symbol} {}{type_suffix}\n", device.device));

        for kind in &device.kinds {
            render_kind(out, kind, limit, painter);
        }
    }
}

fn render_kind(out: &mut String, outcome: &KindOutcome, limit: Option<usize>, painter: &Painter) {
    let drifted: Vec<String> = outcome.drift.iter().map(|d| d.name.clone()).collect();
    let rows = [
        (painter.paint("+", |s| s.green()), "added", &outcome.added),
        (painter.paint("-", |s| s.red()), "removed", &outcome.removed),
        (painter.paint("!", |s| s.yellow()), "protected", &outcome.protected),
        (painter.paint("!", |s| s.red()), "forced", &outcome.forced),
        (painter.paint("+", |s| s.dimmed()), "pending add", &outcome.pending_add),
        (painter.paint("-", |s| s.dimmed()), "pending remove", &outcome.pending_remove),
        (painter.paint("~", |s| s.yellow()), "drifted", &drifted),
    ];

    for (symbol, what, names) in rows {
        if names.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "      {symbol} {} {what} ({}): {}\n",
            outcome.kind,
            names.len(),
            format_names(names, limit)
        ));
    }
}

/// Join names, truncating after `limit` with "... and N more"
fn format_names(names: &[String], limit: Option<usize>) -> String {
    match limit {
        Some(limit) if names.len() > limit => format!(
            "{} ... and {} more",
            names[..limit].join(", "),
            names.len() - limit
        ),
        _ => names.join(", "),
    }
}

fn render_errors(out: &mut String, report: &SyncReport, painter: &Painter) {
    if report.errors.is_empty() {
        return;
    }

    out.push('\n');
    out.push_str(&format!("{}\n", painter.paint("Errors", |s| s.red().bold())));
    for entry in &report.errors {
        out.push_str(&format!(
            "  {} [{}] {}\n",
            entry.device, entry.error, entry.message
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SyncMode;
    use crate::error::SyncError;
    use crate::report::{DeviceOutcome, ReportBuilder};
    use inventory::{ComponentKind, Device};

    fn names(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("Gi1/0/{i}")).collect()
    }

    fn report() -> SyncReport {
        let mut builder = ReportBuilder::new(SyncMode::Sync, &[ComponentKind::Interface]);

        let mut changed = KindOutcome::new(ComponentKind::Interface);
        changed.added = names(8);
        changed.protected = vec!["mgmt0".into()];
        builder.accumulate(DeviceOutcome::succeeded(
            &Device::new(1, "access-01"),
            "Cisco C9300-48P",
            vec![changed],
        ));

        builder.accumulate(DeviceOutcome::succeeded(
            &Device::new(2, "access-02"),
            "Cisco C9300-48P",
            vec![KindOutcome::new(ComponentKind::Interface)],
        ));

        builder.accumulate(DeviceOutcome::failed(
            &Device::new(3, "access-03"),
            &SyncError::NoDeviceType {
                device: "access-03".into(),
            },
        ));

        builder.finalize(0, None)
    }

    #[test]
    fn test_header_and_totals() {
        let text = render_text(&report(), &ReportOptions::plain());

        assert!(text.starts_with(&format!("{}\n{TITLE}\n", "=".repeat(RULE_WIDTH))));
        assert!(text.contains("Mode:     sync"));
        assert!(text.contains("3 processed, 2 succeeded, 1 failed, 1 with changes"));
        let row = text.lines().find(|l| l.starts_with("Interfaces")).unwrap();
        let cells: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(cells, vec!["Interfaces", "8", "0", "1", "0", "0", "0", "0"]);
    }

    #[test]
    fn test_lists_only_changed_or_failed_devices() {
        let text = render_text(&report(), &ReportOptions::plain());

        assert!(text.contains("access-01 (Cisco C9300-48P)"));
        assert!(text.contains("✗ access-03: NoDeviceType"));
        assert!(!text.contains("access-02"));
        assert!(text.contains("interfaces added (8): Gi1/0/1, Gi1/0/2, Gi1/0/3, Gi1/0/4, Gi1/0/5 ... and 3 more"));
        assert!(text.contains("interfaces protected (1): mgmt0"));
        assert!(text.contains("access-03 [NoDeviceType] device access-03 has no device type assigned"));
    }

    #[test]
    fn test_full_listing() {
        let options = ReportOptions {
            full_listing: true,
            ..ReportOptions::plain()
        };
        let text = render_text(&report(), &options);

        assert!(text.contains("○ access-02"));
        assert!(text.contains("Gi1/0/8"));
        assert!(!text.contains("more"));
    }

    #[test]
    fn test_cancellation_line() {
        let report = ReportBuilder::new(SyncMode::Diff, &[ComponentKind::Interface])
            .finalize(4, Some("time limit of 60s reached".into()));
        let text = render_text(&report, &ReportOptions::plain());
        assert!(text.contains("Cancelled: time limit of 60s reached; 4 device(s) not started"));
    }

    #[test]
    fn test_format_names() {
        let list = names(3);
        assert_eq!(format_names(&list, None), "Gi1/0/1, Gi1/0/2, Gi1/0/3");
        assert_eq!(format_names(&list, Some(3)), "Gi1/0/1, Gi1/0/2, Gi1/0/3");
        assert_eq!(format_names(&list, Some(1)), "Gi1/0/1 ... and 2 more");
    }
}
