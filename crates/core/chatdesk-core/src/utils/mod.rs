//! Shared helpers

pub mod logger;

use once_cell::sync::Lazy;
use regex::Regex;

static PII_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern"),
            "email@redacted",
        ),
        (
            Regex::new(r"\+?\(?\d[\d\s()-]{7,}\d").expect("phone pattern"),
            "PHONE_REDACTED",
        ),
    ]
});

/// Mask emails and phone numbers, truncating very long text
pub fn redact_pii(text: &str) -> String {
    let mut s: String = text.chars().take(2000).collect();
    for (re, rep) in PII_PATTERNS.iter() {
        s = re.replace_all(&s, *rep).into_owned();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_contact_details() {
        let out = redact_pii("intake from ana@example.com phone (31) 99754-2811");
        assert!(!out.contains("ana@example.com"));
        assert!(!out.contains("99754"));
        assert!(out.contains("email@redacted"));
        assert!(out.contains("PHONE_REDACTED"));
    }

    #[test]
    fn test_keeps_plain_text() {
        assert_eq!(redact_pii("relay opened"), "relay opened");
    }
}
