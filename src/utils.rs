//! Utility functions shared across the engine.

/// Duration label handling ("12:34", "1:02:03")
pub mod timecode {
    /// Parse a catalog duration label into seconds.
    ///
    /// Accepts `M:SS` and `H:MM:SS`. Returns None for anything else -
    /// callers decide whether a bad label is a warning or an error.
    pub fn parse_label(label: &str) -> Option<f64> {
        let parts: Vec<&str> = label.trim().split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return None;
        }
        let mut total: u64 = 0;
        for part in &parts {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let value: u64 = part.parse().ok()?;
            total = total * 60 + value;
        }
        Some(total as f64)
    }

    /// Format seconds back into a label (`M:SS` below one hour, `H:MM:SS` above).
    pub fn format_secs(secs: f64) -> String {
        let total = secs.max(0.0).round() as u64;
        let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
        if h > 0 {
            format!("{}:{:02}:{:02}", h, m, s)
        } else {
            format!("{}:{:02}", m, s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::timecode::{format_secs, parse_label};

    #[test]
    fn test_parse_minutes_seconds() {
        assert_eq!(parse_label("12:34"), Some(754.0));
        assert_eq!(parse_label("0:05"), Some(5.0));
    }

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_label("1:02:03"), Some(3723.0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_label(""), None);
        assert_eq!(parse_label("754"), None);
        assert_eq!(parse_label("12:3a"), None);
        assert_eq!(parse_label("1:2:3:4"), None);
        assert_eq!(parse_label("::"), None);
    }

    #[test]
    fn test_format_round_trip() {
        assert_eq!(format_secs(754.0), "12:34");
        assert_eq!(format_secs(3723.0), "1:02:03");
        assert_eq!(format_secs(5.0), "0:05");
        assert_eq!(format_secs(-3.0), "0:00");
    }
}
