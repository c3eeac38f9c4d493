//! Console sink implementation

use crate::core::{timestamp, LogLevel, Result};
use chrono::{DateTime, Utc};
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::{self, Write};

#[cfg(feature = "console")]
const TIMESTAMP_RGB: (u8, u8, u8) = (150, 150, 150);

/// Writes `[timestamp] LEVEL message` lines to stdout
pub struct ConsoleSink {
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    pub fn log(&self, timestamp: DateTime<Utc>, level: LogLevel, message: &str) {
        let line = self.format_line(timestamp, level, message);
        // Locked so concurrent callers never interleave within a line
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
    }

    pub fn flush(&self) -> Result<()> {
        io::stdout().flush()?;
        Ok(())
    }

    fn format_line(&self, timestamp: DateTime<Utc>, level: LogLevel, message: &str) -> String {
        let ts = format!("[{}]", timestamp::console(&timestamp));
        let level_str = level.as_str().to_uppercase();

        if self.use_colors {
            Self::colorize(&ts, &level_str, level, message)
        } else {
            format!("{} {} {}", ts, level_str, message)
        }
    }

    #[cfg(feature = "console")]
    fn colorize(ts: &str, level_str: &str, level: LogLevel, message: &str) -> String {
        let (r, g, b) = TIMESTAMP_RGB;
        let (lr, lg, lb) = level.rgb();
        format!(
            "{} {} {}",
            ts.truecolor(r, g, b),
            level_str.truecolor(lr, lg, lb),
            message
        )
    }

    #[cfg(not(feature = "console"))]
    fn colorize(ts: &str, level_str: &str, _level: LogLevel, message: &str) -> String {
        format!("{} {} {}", ts, level_str, message)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_format() {
        let sink = ConsoleSink::with_colors(false);
        let line = sink.format_line(Utc::now(), LogLevel::Warning, "disk almost full");

        assert!(line.starts_with('['));
        assert!(line.ends_with("] WARNING disk almost full"));

        // [YYYY-MM-DDTHH:MM:SS.fffffff]
        let stamp = &line[1..line.find(']').unwrap()];
        assert_eq!(stamp.len(), 27);
        assert_eq!(&stamp[10..11], "T");
    }

    #[test]
    fn test_colored_format_keeps_message() {
        let sink = ConsoleSink::new();
        let line = sink.format_line(Utc::now(), LogLevel::Error, "boom");
        assert!(line.contains("ERROR"));
        assert!(line.ends_with("boom"));
    }
}
