/// Maximum length for response bodies carried in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    // Back off to a char boundary so multi-byte text doesn't panic
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Format a remaining lifetime in seconds for display, e.g. "14m 32s"
pub fn format_remaining(seconds: i64) -> String {
    if seconds <= 0 {
        "expired".to_string()
    } else if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");

        let long = "x".repeat(600);
        let truncated = truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));
    }

    #[test]
    fn test_truncate_body_multibyte() {
        let long = "é".repeat(300); // 600 bytes
        let truncated = truncate_body(&long);
        assert!(truncated.contains("truncated, 600 total bytes"));
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(0), "expired");
        assert_eq!(format_remaining(-4), "expired");
        assert_eq!(format_remaining(45), "45s");
        assert_eq!(format_remaining(872), "14m 32s");
        assert_eq!(format_remaining(7260), "2h 1m");
    }
}
