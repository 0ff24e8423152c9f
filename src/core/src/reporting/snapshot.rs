//! Plain-text snapshot report.
//!
//! The report is meant to be read by a human or attached to a log: a short header with the
//! active filter toggles, then the longest ended sessions and the busiest ports since
//! counting began.

use crate::network::connection_filter::ConnectionFilter;
use crate::storage::types::StatsDocument;
use chrono::{DateTime, SecondsFormat, Utc};

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compact age: `42s`, `3m07s`, `5h02m`, `2d04h`.
pub fn format_age(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    if minutes < 60 {
        return format!("{}m{:02}s", minutes, seconds);
    }
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours < 24 {
        return format!("{}h{:02}m", hours, minutes);
    }
    format!("{}d{:02}h", hours / 24, hours % 24)
}

fn shown(hidden: bool) -> &'static str {
    if hidden {
        "HIDE"
    } else {
        "SHOW"
    }
}

/// Renders the snapshot report. Each section holds at most `rows` entries.
pub fn build_snapshot_text(
    doc: &StatsDocument,
    filter: &ConnectionFilter,
    rows: usize,
    now: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        format!("TARPIT WATCH v{} snapshot", APP_VERSION),
        format!("Time: {}", now.to_rfc3339_opts(SecondsFormat::Secs, true)),
        format!("Theme: {}", doc.theme),
        format!(
            "Private:{}  Admin:{}  Mode:{}",
            shown(filter.hide_private),
            shown(filter.hide_admin),
            filter.mode_label()
        ),
        String::new(),
        String::from("Longest ESTABLISHED (ENDED history):"),
    ];

    for record in doc.ended_history.ranked().iter().take(rows) {
        lines.push(format!(
            "- {}:{} -> {}  {}  [{}]",
            record.src,
            record.sport,
            record.dport,
            format_age(record.duration_s),
            record.container
        ));
    }
    lines.push(String::new());

    lines.push(String::from("Top total port hits (lifetime):"));
    for (port, count) in doc.lifetime_port_hits.top(rows) {
        lines.push(format!("- {}: {}", port, count));
    }
    lines.push(String::new());

    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::FilterConfig;
    use crate::network::types::TcpState;
    use crate::storage::types::EndedSession;
    use chrono::TimeZone;
    use std::net::Ipv4Addr;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(0), "0s");
        assert_eq!(format_age(59), "59s");
        assert_eq!(format_age(60), "1m00s");
        assert_eq!(format_age(187), "3m07s");
        assert_eq!(format_age(3600), "1h00m");
        assert_eq!(format_age(5 * 3600 + 125), "5h02m");
        assert_eq!(format_age(86_400), "1d00h");
        assert_eq!(format_age(2 * 86_400 + 4 * 3600 + 59), "2d04h");
    }

    fn document() -> StatsDocument {
        let mut doc = StatsDocument::new();
        for (sport, duration_s) in [(4000u16, 5u64), (4001, 3700), (4002, 61)] {
            doc.ended_history.insert(
                EndedSession {
                    ended_ts: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
                    src: Ipv4Addr::new(198, 51, 100, 7),
                    sport,
                    dst: Ipv4Addr::new(203, 0, 113, 9),
                    dport: 22,
                    state: TcpState::Established,
                    duration_s,
                    container: String::from("cowrie"),
                },
                50,
            );
        }
        for port in [22, 22, 22, 80, 443, 443] {
            doc.lifetime_port_hits.record(port);
        }
        doc
    }

    #[test]
    fn test_snapshot_layout() {
        let filter = ConnectionFilter::new(&FilterConfig::default());
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();
        let text = build_snapshot_text(&document(), &filter, 2, now);

        let expected = format!(
            "TARPIT WATCH v{} snapshot\n\
             Time: 2025-06-01T12:30:00Z\n\
             Theme: amber\n\
             Private:HIDE  Admin:HIDE  Mode:ALL\n\
             \n\
             Longest ESTABLISHED (ENDED history):\n\
             - 198.51.100.7:4001 -> 22  1h01m  [cowrie]\n\
             - 198.51.100.7:4002 -> 22  1m01s  [cowrie]\n\
             \n\
             Top total port hits (lifetime):\n\
             - 22: 3\n\
             - 443: 2\n\
             \n",
            APP_VERSION
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_snapshot_of_empty_document() {
        let mut filter = ConnectionFilter::new(&FilterConfig::default());
        filter.hide_private = false;
        filter.established_only = true;
        let text = build_snapshot_text(&StatsDocument::new(), &filter, 20, Utc::now());

        assert!(text.contains("Private:SHOW  Admin:HIDE  Mode:EST\n"));
        assert!(text.ends_with("Top total port hits (lifetime):\n\n"));
    }
}
