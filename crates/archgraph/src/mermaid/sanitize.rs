//! Label sanitization

/// Characters with meaning in Mermaid node and subgraph syntax
const RESERVED: &[char] = &['[', ']', '(', ')', '{', '}', '<', '>', '"'];

/// Strip Mermaid-reserved characters from an attribute-derived label
pub fn sanitize_label(label: &str) -> String {
    label.chars().filter(|c| !RESERVED.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_label_unchanged() {
        assert_eq!(sanitize_label("Order Service"), "Order Service");
        assert_eq!(sanitize_label(""), "");
    }

    #[test]
    fn test_reserved_characters_removed() {
        assert_eq!(sanitize_label("Cache [Redis]"), "Cache Redis");
        assert_eq!(sanitize_label("fn(x) {y}"), "fnx y");
        assert_eq!(sanitize_label("<b>\"quoted\"</b>"), "bquoted/b");
    }

    #[test]
    fn test_unicode_preserved() {
        assert_eq!(sanitize_label("Zahlungsdienst (EU) ✓"), "Zahlungsdienst EU ✓");
    }
}
