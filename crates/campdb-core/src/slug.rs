/// Generate a URL-safe slug from a display name.
///
/// Lowercases, maps spaces to hyphens, drops every other non-alphanumeric
/// character, and collapses repeated hyphens.
#[must_use]
pub fn slug_from_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::slug_from_name;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slug_from_name("Acme Beverages"), "acme-beverages");
    }

    #[test]
    fn drops_punctuation_and_collapses_hyphens() {
        assert_eq!(slug_from_name("Café -- del  Mar!"), "caf-del-mar");
    }

    #[test]
    fn empty_input_is_empty_slug() {
        assert_eq!(slug_from_name("  "), "");
    }
}
