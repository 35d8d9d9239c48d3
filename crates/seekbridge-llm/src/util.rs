//! Helpers for keeping credentials out of logs and error messages

/// Minimum key length to display partial key
const MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY: usize = 8;

/// Number of characters to show at start/end of masked key
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Longest backend error text passed through unchanged
const MAX_ERROR_LEN: usize = 300;

/// Mask API key for safe display in logs
///
/// # Examples
/// ```
/// use seekbridge_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-1...cdef");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY || !key.is_ascii() {
        return "****".to_string();
    }
    format!(
        "{}...{}",
        &key[..KEY_MASK_VISIBLE_CHARS],
        &key[key.len() - KEY_MASK_VISIBLE_CHARS..]
    )
}

/// Cut `text` to at most `max_bytes` without splitting a character
#[must_use]
pub fn truncate_safe(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let end = text
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max_bytes)
        .last()
        .unwrap_or(0);
    &text[..end]
}

/// Replace backend error text that may echo credentials with a fixed message
#[must_use]
pub fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("apikey")
        || lower.contains("api_key")
        || lower.contains("invalid key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("bearer")
    {
        return "API authentication error. Please check your DEEPSEEK_API_KEY.".to_string();
    }

    if lower.contains("rate limit") || lower.contains("quota") {
        return "DeepSeek rate limit exceeded. Please try again later.".to_string();
    }

    if lower.contains("insufficient balance") {
        return "DeepSeek account balance is insufficient.".to_string();
    }

    if error.len() > MAX_ERROR_LEN {
        format!("{}...(truncated)", truncate_safe(error, MAX_ERROR_LEN))
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key_long() {
        let masked = mask_api_key("sk-1234567890abcdefghij");
        assert_eq!(masked, "sk-1...ghij");
        assert!(!masked.contains("567890"));
    }

    #[test]
    fn test_mask_api_key_short() {
        assert_eq!(mask_api_key("short"), "****");
        assert_eq!(mask_api_key("12345678"), "****");
        assert_eq!(mask_api_key(""), "****");
    }

    #[test]
    fn test_sanitize_api_error() {
        let sanitized = sanitize_api_error("Invalid API key: sk-1234567890");
        assert!(!sanitized.contains("sk-"));
        assert!(sanitized.contains("DEEPSEEK_API_KEY"));

        let sanitized = sanitize_api_error("Rate limit exceeded");
        assert!(sanitized.contains("rate limit"));

        assert_eq!(sanitize_api_error("model not found"), "model not found");
    }

    #[test]
    fn test_sanitize_truncates_long_errors() {
        let long = "é".repeat(400);
        let sanitized = sanitize_api_error(&long);
        assert!(sanitized.ends_with("...(truncated)"));
        assert!(sanitized.len() < long.len());
    }

    #[test]
    fn test_truncate_safe_respects_char_boundaries() {
        assert_eq!(truncate_safe("héllo", 2), "h");
        assert_eq!(truncate_safe("héllo", 3), "hé");
        assert_eq!(truncate_safe("abc", 10), "abc");
    }
}
