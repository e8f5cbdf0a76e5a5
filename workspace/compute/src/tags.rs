//! Normalisation rules for tags: HEX colours and URL slugs.

/// Validates a `#RRGGBB` colour and returns it upper-cased.
///
/// Returns `None` for anything else, including the short `#RGB` form.
pub fn normalize_color(color: &str) -> Option<String> {
    let hex = color.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", hex.to_ascii_uppercase()))
}

/// Derives a slug from a tag name: lower-cased, with every run of
/// non-alphanumeric characters collapsed into a single `-`.
/// Non-ASCII letters are kept as they are.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// A slug is valid when it is non-empty and consists of letters, digits, `-` and `_`.
/// Letters and digits from any script are accepted, matching [`slugify`].
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color("#49b64e"), Some("#49B64E".to_string()));
        assert_eq!(normalize_color("#E26C2D"), Some("#E26C2D".to_string()));
        assert_eq!(normalize_color(" #abcdef "), Some("#ABCDEF".to_string()));
        assert_eq!(normalize_color("49B64E"), None);
        assert_eq!(normalize_color("#FFF"), None);
        assert_eq!(normalize_color("#GGGGGG"), None);
        assert_eq!(normalize_color("#ABCDEF0"), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Breakfast"), "breakfast");
        assert_eq!(slugify("  Quick & Easy!  "), "quick-easy");
        assert_eq!(slugify("Low--fat  dinner"), "low-fat-dinner");
        assert_eq!(slugify("Завтрак Быстро"), "завтрак-быстро");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("breakfast"));
        assert!(is_valid_slug("low_fat-2"));
        assert!(is_valid_slug("завтрак"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug("a.b"));
        assert!(!is_valid_slug("a/b"));
    }

    #[test]
    fn test_derived_slugs_are_valid() {
        for name in ["Завтрак Быстро", "Quick & Easy!", "Café crème", "早餐"] {
            let slug = slugify(name);
            assert!(is_valid_slug(&slug), "slug {slug:?} of {name:?} should be valid");
        }
    }
}
