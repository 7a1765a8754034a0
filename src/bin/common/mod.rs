// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for the CLI.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Install the log subscriber. Logs go to stderr.
///
/// `-v` flags pick the level (info, debug, trace); without them `RUST_LOG`
/// is honored, falling back to warnings only.
pub fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into()),
        1 => "info".into(),
        2 => "debug".into(),
        _ => "trace".into(),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Human-readable span of a nanosecond duration.
pub fn format_duration(nanos: u64) -> String {
    let secs = nanos / 1_000_000_000;
    let millis = nanos % 1_000_000_000 / 1_000_000;
    match secs {
        3600.. => format!("{}h {}m", secs / 3600, secs % 3600 / 60),
        60.. => format!("{}m {}s", secs / 60, secs % 60),
        1.. => format!("{secs}.{millis:03}s"),
        0 => format!("{millis}ms"),
    }
}

/// UTC wall-clock time of a nanosecond timestamp, millisecond precision.
pub fn format_timestamp(nanos: u64) -> String {
    i64::try_from(nanos)
        .ok()
        .map(chrono::DateTime::<chrono::Utc>::from_timestamp_nanos)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| format!("{nanos} ns"))
}

/// Format a byte count with a binary unit.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(500_000_000), "500ms");
        assert_eq!(format_duration(1_500_000_000), "1.500s");
        assert_eq!(format_duration(90_000_000_000), "1m 30s");
        assert_eq!(format_duration(3_600_000_000_000), "1h 0m");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00.000 UTC");
        assert_eq!(
            format_timestamp(1_700_000_000_250_000_000),
            "2023-11-14 22:13:20.250 UTC"
        );
        assert_eq!(format_timestamp(u64::MAX), format!("{} ns", u64::MAX));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
