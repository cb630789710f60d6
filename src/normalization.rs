use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

const BASE64_PREFIX: &str = "base64:";

/// Standard alphabet, accepting payloads with or without `=` padding.
const FILE_PAYLOAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Case-fold text before it reaches the layer evaluators.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

/// Unwrap `base64:`-prefixed file content.
///
/// Content without the prefix, or whose payload fails to decode, is returned
/// unchanged.
pub fn decode_file_content(raw: &str) -> String {
    let Some(payload) = raw.strip_prefix(BASE64_PREFIX) else {
        return raw.to_string();
    };

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    match FILE_PAYLOAD.decode(compact.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            log::debug!("base64 file content did not decode, scanning raw text: {e}");
            raw.to_string()
        }
    }
}

/// Subject and body joined the way the keyword rules expect them.
pub fn email_text(subject: &str, body: &str) -> String {
    normalize(&format!("{subject} {body}"))
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(normalize("URGENT Verify"), "urgent verify");
    }

    #[test]
    fn test_decode_prefixed_content() {
        // "<form>" in base64
        assert_eq!(decode_file_content("base64:PGZvcm0+"), "<form>");
        assert_eq!(decode_file_content("base64:PGZv\ncm0+"), "<form>");
    }

    #[test]
    fn test_decode_unpadded_content() {
        assert_eq!(decode_file_content("base64:PGZvcm0"), "<form");
        assert_eq!(decode_file_content("base64:PGZvcm0="), "<form");
    }

    #[test]
    fn test_decode_failure_keeps_raw() {
        assert_eq!(decode_file_content("base64:not*valid*"), "base64:not*valid*");
        assert_eq!(decode_file_content("plain text"), "plain text");
    }

    #[test]
    fn test_email_text() {
        assert_eq!(email_text("Security Alert", "Click HERE"), "security alert click here");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
