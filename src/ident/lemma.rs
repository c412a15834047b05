//! Reversible escaping of written forms into id-safe tokens.
//!
//! ASCII letters, digits and `.` pass through. A space becomes `_` and a hyphen
//! doubles to `--`. Every other character becomes a sigil `-<name>-`, with a
//! fixed name for common punctuation and lowercase hex (at least four digits)
//! for anything else. Sigil names never contain `-`, so decoding is a single
//! left-to-right scan.

use std::fmt::Write;

use crate::error::KeyError;

use super::KeyResult;

const NAMED_SIGILS: &[(char, &str)] = &[
    ('_', "lowbar"),
    ('(', "lb"),
    (')', "rb"),
    ('\'', "ap"),
    ('/', "sl"),
    (':', "cn"),
    (',', "cm"),
    ('!', "ex"),
    ('+', "pl"),
];

fn sigil_name(c: char) -> Option<&'static str> {
    NAMED_SIGILS.iter().find(|(ch, _)| *ch == c).map(|(_, n)| *n)
}

fn sigil_char(name: &str) -> Option<char> {
    if let Some((c, _)) = NAMED_SIGILS.iter().find(|(_, n)| *n == name) {
        return Some(*c);
    }
    if name.len() >= 4 && name.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
        return u32::from_str_radix(name, 16).ok().and_then(char::from_u32);
    }
    None
}

/// Escape a written form into the lemma slot of entry and sense ids.
pub fn escape_lemma(lemma: &str) -> String {
    let mut out = String::with_capacity(lemma.len() + 8);
    for c in lemma.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' => out.push(c),
            ' ' => out.push('_'),
            '-' => out.push_str("--"),
            _ => match sigil_name(c) {
                Some(name) => {
                    out.push('-');
                    out.push_str(name);
                    out.push('-');
                }
                None => {
                    let _ = write!(out, "-{:04x}-", c as u32);
                }
            },
        }
    }
    out
}

/// Invert [`escape_lemma`].
pub fn unescape_lemma(token: &str) -> KeyResult<String> {
    let invalid = |reason: &str| KeyError::InvalidEscape {
        token: token.to_string(),
        reason: reason.to_string(),
    };

    let mut out = String::with_capacity(token.len());
    let mut rest = token;
    while let Some(c) = rest.chars().next() {
        match c {
            '_' => {
                out.push(' ');
                rest = &rest[1..];
            }
            '-' => {
                let body = &rest[1..];
                if let Some(tail) = body.strip_prefix('-') {
                    out.push('-');
                    rest = tail;
                    continue;
                }
                let end = body.find('-').ok_or_else(|| invalid("unterminated sigil"))?;
                let name = &body[..end];
                let decoded =
                    sigil_char(name).ok_or_else(|| invalid(&format!("unknown sigil `{name}`")))?;
                out.push(decoded);
                rest = &body[end + 1..];
            }
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' => {
                out.push(c);
                rest = &rest[1..];
            }
            other => return Err(invalid(&format!("unexpected character {other:?}"))),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words_pass_through() {
        assert_eq!(escape_lemma("dog"), "dog");
        assert_eq!(escape_lemma("U.S.A."), "U.S.A.");
    }

    #[test]
    fn multiword_and_hyphen() {
        assert_eq!(escape_lemma("hot dog"), "hot_dog");
        assert_eq!(escape_lemma("well-being"), "well--being");
        assert_eq!(unescape_lemma("well--being").unwrap(), "well-being");
    }

    #[test]
    fn punctuation_and_unicode_use_sigils() {
        assert_eq!(escape_lemma("rock 'n' roll"), "rock_-ap-n-ap-_roll");
        assert_eq!(escape_lemma("café"), "caf-00e9-");
        assert_eq!(escape_lemma("a_b"), "a-lowbar-b");
        assert_eq!(escape_lemma("😀"), "-1f600-");
    }

    #[test]
    fn escape_is_bijective_on_awkward_inputs() {
        let words = [
            "",
            "dog",
            "hot dog",
            "--",
            "-a-",
            "a-lb-b",
            "Ångström",
            "e.g.",
            "C++",
            "what's up?",
            "1:1",
            "a_b c",
            "A-0020-",
            "naïve/näive",
            "x\ty",
        ];
        for w in words {
            let token = escape_lemma(w);
            assert_eq!(unescape_lemma(&token).unwrap(), w, "token {token}");
        }
    }

    #[test]
    fn distinct_inputs_give_distinct_tokens() {
        let words = ["a b", "a_b", "a-b", "a--b", "a-lowbar-b", "a(b", "a-lb-b"];
        let tokens: std::collections::HashSet<_> = words.iter().map(|w| escape_lemma(w)).collect();
        assert_eq!(tokens.len(), words.len());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(unescape_lemma("dog-").is_err());
        assert!(unescape_lemma("dog-zz-").is_err());
        assert!(unescape_lemma("dog%").is_err());
    }
}
