/// The opaque prefix shown in place of a secret's body.
pub const MASK_TOKEN: &str = "••••••••";

/// Masks a secret for display: the mask token plus at most the last four
/// characters. An unavailable or empty secret renders as the bare token.
pub fn mask_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return MASK_TOKEN.to_string();
    }
    let chars: Vec<char> = trimmed.chars().collect();
    let tail_start = chars.len().saturating_sub(4);
    let tail: String = chars[tail_start..].iter().collect();
    format!("{MASK_TOKEN}{tail}")
}
