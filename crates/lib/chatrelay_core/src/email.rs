//! Email normalization.
//!
//! The normalized email is the conversation partition key, so every entry
//! point funnels user-supplied addresses through here.

/// Trim surrounding whitespace and lower-case.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize an email, returning `None` when nothing is left.
pub fn normalize_required(raw: &str) -> Option<String> {
    let email = normalize_email(raw);
    if email.is_empty() { None } else { Some(email) }
}
