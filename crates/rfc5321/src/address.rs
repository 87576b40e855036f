//! `good_address` / angle-bracket address extraction (GLOSSARY, promoted to
//! a standalone helper per SPEC_FULL.md's supplemented-features section).
//!
//! Grounded on `original_source/src/SmtpNya.cpp`'s `ExtractAddress`: walk
//! the string tracking quoted sections and parenthesised comments, and once
//! an unquoted, uncommented `<` is seen, return everything up to the
//! matching `>`. If no `<...>` is found, the whole string is the address.

/// Given `"Name" <user@host>`, return `user@host`. If no `<...>` is
/// present, return the whole string. Quoted sections and parenthesised
/// comments are skipped while looking for the opening `<`.
pub fn extract_address(address: &str) -> &str {
    let mut paren_depth: i32 = 0;
    let mut addr_start: Option<usize> = None;
    let mut in_quote = false;

    for (i, ch) in address.char_indices() {
        if in_quote {
            if ch == '"' {
                in_quote = false;
            }
            continue;
        }
        if let Some(start) = addr_start {
            if ch == '>' {
                return &address[start..i];
            }
            continue;
        }
        match ch {
            '(' => paren_depth += 1,
            ')' => paren_depth = (paren_depth - 1).max(0),
            '"' if paren_depth == 0 => in_quote = true,
            '<' if paren_depth == 0 => addr_start = Some(i + ch.len_utf8()),
            _ => {}
        }
    }

    address
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plain_address_unchanged() {
        assert_eq!(extract_address("user@host"), "user@host");
    }

    #[test]
    fn extracts_from_angle_brackets() {
        assert_eq!(
            extract_address("\"Name\" <user@host>"),
            "user@host"
        );
    }

    #[test]
    fn skips_parenthesised_comment() {
        assert_eq!(extract_address("(a comment) <user@host>"), "user@host");
    }

    #[test]
    fn ignores_angle_bracket_inside_quotes() {
        assert_eq!(
            extract_address("\"weird>name\" <user@host>"),
            "user@host"
        );
    }

    #[test]
    fn no_angle_brackets_returns_whole_string() {
        assert_eq!(extract_address("just-an-address"), "just-an-address");
    }
}
