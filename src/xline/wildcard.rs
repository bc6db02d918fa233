//! Glob-style mask matching for X-line masks.
//!
//! `*` matches zero or more characters and `?` matches exactly one. Every
//! other character is literal. Case-insensitive matching folds both sides
//! with the RFC 1459 case mapping, so `[` equals `{` for hostnames and nicks
//! just as it does everywhere else on IRC.

/// Convert a single character to IRC lowercase using RFC 1459 case mapping.
///
/// In addition to ASCII lowercase conversion, this maps:
/// - `[` → `{`
/// - `]` → `}`
/// - `\` → `|`
/// - `~` → `^`
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        'A'..='Z' => (c as u8 + 32) as char,
        _ => c,
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Match `subject` against the glob `mask`.
///
/// Empty inputs are handled like any other string: an empty mask only
/// matches an empty subject, and a mask of `*` matches everything.
pub fn matches(subject: &str, mask: &str, case_insensitive: bool) -> bool {
    let fold = |c: char| {
        if case_insensitive {
            irc_lower_char(c)
        } else {
            c
        }
    };
    let pattern: Vec<char> = mask.chars().map(fold).collect();
    let text: Vec<char> = subject.chars().map(fold).collect();

    glob(&pattern, &text)
}

/// Iterative matcher with single-star backtracking.
fn glob(pattern: &[char], text: &[char]) -> bool {
    let mut p = 0;
    let mut t = 0;
    // Pattern index of the last `*` seen, and the text index it was tried at.
    let mut star_p = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star_p = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(sp) = star_p {
            // Let the last star swallow one more character and retry.
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}
