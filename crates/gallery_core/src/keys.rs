use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped when an object key is appended to the bucket URL.
/// Reserved URI characters such as `/`, `?`, `#` and `&` pass through.
const URI_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Human-readable title for an object key: prefix and extension stripped,
/// percent-escapes decoded, runs of `-`/`_` turned into a single space.
pub fn key_to_title(key: &str, prefix: &str) -> String {
    let stripped = key.strip_prefix(prefix).unwrap_or(key);
    let decoded = percent_decode_str(stripped).decode_utf8_lossy();
    let stem = match decoded.rfind('.') {
        Some(idx) if idx + 1 < decoded.len() => &decoded[..idx],
        _ => &decoded[..],
    };

    let mut title = String::with_capacity(stem.len());
    let mut in_separator = false;
    for ch in stem.chars() {
        if ch == '-' || ch == '_' {
            if !in_separator {
                title.push(' ');
            }
            in_separator = true;
        } else {
            title.push(ch);
            in_separator = false;
        }
    }
    title.trim().to_string()
}

/// Public URL of `key` below `base_url`.
pub fn object_url(base_url: &str, key: &str) -> String {
    format!("{base_url}{}", utf8_percent_encode(key, URI_ENCODE_SET))
}

/// Case-insensitive ordering that compares digit runs numerically,
/// so `print2` sorts before `print10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_digits = take_digits(&mut left);
                let r_digits = take_digits(&mut right);
                let ord = compare_digit_runs(&l_digits, &r_digits);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                let ord = l.to_lowercase().cmp(r.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(ch) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(ch);
        chars.next();
    }
    digits
}

fn compare_digit_runs(left: &str, right: &str) -> Ordering {
    let left = left.trim_start_matches('0');
    let right = right.trim_start_matches('0');
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_strips_prefix_extension_and_separators() {
        assert_eq!(
            key_to_title("prints/blue_heron--marsh.jpg", "prints/"),
            "blue heron marsh"
        );
        assert_eq!(key_to_title("prints/Sea%20Glass.png", "prints/"), "Sea Glass");
        assert_eq!(key_to_title("other/_dots.v2.webp", "prints/"), "other/ dots.v2");
    }

    #[test]
    fn title_keeps_trailing_dot() {
        assert_eq!(key_to_title("odd.", ""), "odd.");
    }

    #[test]
    fn object_url_escapes_spaces_but_keeps_slashes() {
        assert_eq!(
            object_url("https://b.s3.amazonaws.com/", "prints/Sea Glass.png"),
            "https://b.s3.amazonaws.com/prints/Sea%20Glass.png"
        );
    }

    #[test]
    fn natural_order_compares_numbers_by_value() {
        let mut names = vec!["print10", "Print2", "print1", "apple"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["apple", "print1", "Print2", "print10"]);
    }

    #[test]
    fn natural_order_ignores_leading_zeros() {
        assert_eq!(natural_cmp("a007", "a7"), "a007".cmp("a7"));
        assert_eq!(natural_cmp("a007", "a8"), Ordering::Less);
    }
}
