//! Lexical predicates over operand text, one per declared operand kind
//! (spec §4.1). These run during loading, before an operand's text is
//! turned into a runtime `Operand`.

/// Characters allowed in an identifier besides Unicode letters and digits.
const IDENT_EXTRA: &[char] = &['_', '-', '$', '&', '%', '*', '!', '?'];

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || IDENT_EXTRA.contains(&c)
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || IDENT_EXTRA.contains(&c)
}

/// A bare identifier: letters/digits/`_-$&%*!?`, digits never first.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_continue),
        _ => false,
    }
}

/// `label` operand: a bare identifier.
pub fn is_label(s: &str) -> bool {
    is_identifier(s)
}

/// `var` operand: `GF@`, `LF@`, or `TF@` followed by an identifier.
/// Returns the frame tag text and the variable name on success.
pub fn split_var(s: &str) -> Option<(&str, &str)> {
    let (tag, rest) = s.split_once('@')?;
    if matches!(tag, "GF" | "LF" | "TF") && is_identifier(rest) {
        Some((tag, rest))
    } else {
        None
    }
}

pub fn is_var(s: &str) -> bool {
    split_var(s).is_some()
}

/// `type` operand: exactly one of `int`, `string`, `bool`.
pub fn is_type_keyword(s: &str) -> bool {
    matches!(s, "int" | "string" | "bool")
}

/// `int` operand: optional leading `-`, then one or more decimal digits.
pub fn is_int(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// `bool` operand: exactly `true` or `false`.
pub fn is_bool(s: &str) -> bool {
    matches!(s, "true" | "false")
}

/// `nil` operand: exactly `nil`.
pub fn is_nil(s: &str) -> bool {
    s == "nil"
}

/// `string` operand: any run of characters excluding whitespace, `#`, and
/// backslash, except that a backslash must introduce exactly three decimal
/// digits. The empty string is valid.
pub fn is_string(s: &str) -> bool {
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let digits: String = chars.by_ref().take(3).collect();
            if digits.len() != 3 || !digits.chars().all(|d| d.is_ascii_digit()) {
                return false;
            }
        } else if c.is_whitespace() || c == '#' {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("foo"));
        assert!(is_identifier("_foo-bar?"));
        assert!(is_identifier("a1"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn vars() {
        assert_eq!(split_var("GF@x"), Some(("GF", "x")));
        assert_eq!(split_var("LF@my_var"), Some(("LF", "my_var")));
        assert_eq!(split_var("TF@"), None);
        assert_eq!(split_var("XX@x"), None);
        assert_eq!(split_var("noat"), None);
    }

    #[test]
    fn ints_and_bools() {
        assert!(is_int("123"));
        assert!(is_int("-5"));
        assert!(!is_int("-"));
        assert!(!is_int("1.5"));
        assert!(is_bool("true"));
        assert!(is_bool("false"));
        assert!(!is_bool("True"));
    }

    #[test]
    fn strings_with_escapes() {
        assert!(is_string(""));
        assert!(is_string("hello"));
        assert!(is_string("a\\032b"));
        assert!(!is_string("a b"));
        assert!(!is_string("a#b"));
        assert!(!is_string("a\\12b"));
        assert!(!is_string("a\\12"));
    }
}
