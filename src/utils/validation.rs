use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use validator::{ValidationError, ValidationErrors};

/// Passwords rejected at registration regardless of their shape
pub const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password12", "password123", "passw0rd", "p@ssword1",
    "12345678", "123456789", "1234567890", "11111111", "00000000", "87654321",
    "qwerty12", "qwerty123", "qwertyuiop", "1q2w3e4r", "1qaz2wsx", "zaq12wsx",
    "abc12345", "abcd1234", "iloveyou1", "letmein1", "welcome1", "welcome123",
    "monkey123", "dragon123", "football1", "baseball1", "sunshine1", "princess1",
    "admin123", "administrator1", "master123", "trustno1", "superman1", "batman123",
    "starwars1", "shadow123", "michael1", "jennifer1", "charlie1", "computer1",
    "internet1", "freedom1", "whatever1", "changeme1", "secret123", "login123",
    "pass1234", "test1234", "user1234", "hello123", "summer2020", "winter2020",
];

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*(script|style)[^>]*>.*?<\s*/\s*(script|style)\s*>").unwrap()
});
static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Strips HTML markup (and the bodies of script/style blocks) from free text.
pub fn strip_markup(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");
    MARKUP_TAG.replace_all(&without_scripts, "").trim().to_string()
}

fn failure(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Username rule: ASCII only, no whitespace.
pub fn username_shape(value: &str) -> Result<(), ValidationError> {
    if !value.is_ascii() {
        return Err(failure("ascii", "Username can only contain ASCII characters"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(failure("whitespace", "No spaces are allowed in the username"));
    }
    Ok(())
}

/// Password rule: no whitespace, not a common password, at least 8
/// characters with a digit. The upper bound is a separate `length` rule.
pub fn password_strength(value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_whitespace) {
        return Err(failure("whitespace", "No spaces are allowed in the password"));
    }
    if COMMON_PASSWORDS.contains(&value.to_lowercase().as_str()) {
        return Err(failure(
            "common_password",
            "Common words are not accepted as a password",
        ));
    }
    if value.chars().count() < 8 || !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(failure(
            "digit",
            "The password must be at least 8 characters long and contain a number",
        ));
    }
    Ok(())
}

/// Flattens validator output into one sentence per failed rule, in a stable
/// field order.
pub fn collect_messages(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let mut messages = Vec::new();
    for (field, field_errors) in fields {
        for error in field_errors {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid {}", field));
            let message = message.trim_end_matches('.').to_string();
            if !messages.contains(&message) {
                messages.push(message);
            }
        }
    }

    messages
        .into_iter()
        .map(|m| format!("{}.", m))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole megabytes needed to hold `bytes`, rounded up.
pub fn size_in_mb(bytes: u64) -> i32 {
    bytes.div_ceil(1024 * 1024) as i32
}
