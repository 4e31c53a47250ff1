// Utility functions
use chrono::{DateTime, Utc};

/// Removes a surrounding Markdown code fence (```json ... ```) if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Timestamp format used for the `analysed_at` columns.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  ```\n[]\n```  "), "[]");
    }

    #[test]
    fn leaves_bare_json_alone() {
        assert_eq!(strip_code_fence(" {\"objects\": []} "), "{\"objects\": []}");
    }

    #[test]
    fn formats_rfc3339() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(timestamp(at), "2025-03-01T12:30:00+00:00");
    }
}
