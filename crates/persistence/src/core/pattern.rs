//! `like` pattern conversion.
//!
//! Filter patterns use `%` for any run of characters, `_` for exactly one
//! character and `\` to escape the next character. Each backend has its own
//! pattern syntax, so a pattern is parsed once into [`LikePattern`] and then
//! written out in the target form.
//!
//! Case-insensitive matching folds ASCII letters only, so `É` and `é` stay
//! distinct on every backend.

/// One element of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternPart {
    /// A literal character.
    Char(char),
    /// `_`
    AnyChar,
    /// `%`
    AnyRun,
}

/// A parsed `like` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    parts: Vec<PatternPart>,
}

impl LikePattern {
    /// Parses pattern text. A trailing lone `\` matches a literal backslash.
    pub fn parse(pattern: &str) -> Self {
        let mut parts = Vec::with_capacity(pattern.len());
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '%' => parts.push(PatternPart::AnyRun),
                '_' => parts.push(PatternPart::AnyChar),
                '\\' => parts.push(PatternPart::Char(chars.next().unwrap_or('\\'))),
                other => parts.push(PatternPart::Char(other)),
            }
        }
        Self { parts }
    }

    /// The parsed elements.
    pub fn parts(&self) -> &[PatternPart] {
        &self.parts
    }

    /// Anchored regular expression, for MongoDB `$regex` and in-memory
    /// matching. Wildcards match line breaks too. With `case_insensitive`,
    /// ASCII letters become two-letter classes (`[aA]`).
    pub fn to_regex(&self, case_insensitive: bool) -> String {
        let mut out = String::from("(?s)^");
        let mut buf = [0u8; 4];
        for part in &self.parts {
            match part {
                PatternPart::Char(c) if case_insensitive && c.is_ascii_alphabetic() => {
                    push_folded(&mut out, *c);
                }
                PatternPart::Char(c) => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
                PatternPart::AnyChar => out.push('.'),
                PatternPart::AnyRun => out.push_str(".*"),
            }
        }
        out.push_str("\\z");
        out
    }

    /// Case-insensitive Lucene regular expression, for the Elasticsearch
    /// `regexp` query. Lucene anchors the whole term; every character other
    /// than an ASCII letter or digit is escaped.
    pub fn to_folded_regexp(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                PatternPart::Char(c) if c.is_ascii_alphabetic() => push_folded(&mut out, *c),
                PatternPart::Char(c) if c.is_ascii_digit() => out.push(*c),
                PatternPart::Char(c) => {
                    out.push('\\');
                    out.push(*c);
                }
                PatternPart::AnyChar => out.push('.'),
                PatternPart::AnyRun => out.push_str(".*"),
            }
        }
        out
    }

    /// The pattern with ASCII letters lowercased.
    pub fn to_ascii_lowercase(&self) -> LikePattern {
        let parts = self
            .parts
            .iter()
            .map(|part| match part {
                PatternPart::Char(c) => PatternPart::Char(c.to_ascii_lowercase()),
                other => other.clone(),
            })
            .collect();
        LikePattern { parts }
    }

    /// Elasticsearch `wildcard` pattern (`*` and `?`).
    pub fn to_wildcard(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                PatternPart::Char(c @ ('*' | '?' | '\\')) => {
                    out.push('\\');
                    out.push(*c);
                }
                PatternPart::Char(c) => out.push(*c),
                PatternPart::AnyChar => out.push('?'),
                PatternPart::AnyRun => out.push('*'),
            }
        }
        out
    }

    /// SQLite `GLOB` pattern, which is case-sensitive.
    pub fn to_glob(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                PatternPart::Char('*') => out.push_str("[*]"),
                PatternPart::Char('?') => out.push_str("[?]"),
                PatternPart::Char('[') => out.push_str("[[]"),
                PatternPart::Char(c) => out.push(*c),
                PatternPart::AnyChar => out.push('?'),
                PatternPart::AnyRun => out.push('*'),
            }
        }
        out
    }

    /// SQL `LIKE` pattern for use with `ESCAPE '\'`.
    pub fn to_sql_like(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                PatternPart::Char(c @ ('%' | '_' | '\\')) => {
                    out.push('\\');
                    out.push(*c);
                }
                PatternPart::Char(c) => out.push(*c),
                PatternPart::AnyChar => out.push('_'),
                PatternPart::AnyRun => out.push('%'),
            }
        }
        out
    }
}

fn push_folded(out: &mut String, c: char) {
    out.push('[');
    out.push(c.to_ascii_lowercase());
    out.push(c.to_ascii_uppercase());
    out.push(']');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_escapes() {
        let pattern = LikePattern::parse(r"a\%b_%");
        assert_eq!(
            pattern.parts(),
            &[
                PatternPart::Char('a'),
                PatternPart::Char('%'),
                PatternPart::Char('b'),
                PatternPart::AnyChar,
                PatternPart::AnyRun,
            ]
        );
        assert_eq!(LikePattern::parse("x\\").parts().last(), Some(&PatternPart::Char('\\')));
    }

    #[test]
    fn test_to_regex() {
        assert_eq!(LikePattern::parse("Jo%").to_regex(false), r"(?s)^Jo.*\z");
        assert_eq!(LikePattern::parse("a.b_").to_regex(false), r"(?s)^a\.b.\z");
        let re = regex::Regex::new(&LikePattern::parse(r"100\%").to_regex(false)).unwrap();
        assert!(re.is_match("100%"));
        assert!(!re.is_match("1000"));
    }

    #[test]
    fn test_regex_matches_line_breaks() {
        let re = regex::Regex::new(&LikePattern::parse("A_B").to_regex(false)).unwrap();
        assert!(re.is_match("A\nB"));
        let re = regex::Regex::new(&LikePattern::parse("A%").to_regex(false)).unwrap();
        assert!(re.is_match("A\nB"));
        assert!(!re.is_match("xA"));
        // `$` would also accept a trailing newline
        let re = regex::Regex::new(&LikePattern::parse("A").to_regex(false)).unwrap();
        assert!(!re.is_match("A\n"));
    }

    #[test]
    fn test_ascii_folding() {
        assert_eq!(LikePattern::parse("Jo%").to_regex(true), r"(?s)^[jJ][oO].*\z");
        let re = regex::Regex::new(&LikePattern::parse("é%").to_regex(true)).unwrap();
        assert!(re.is_match("élan"));
        assert!(!re.is_match("Élan"));
        let re = regex::Regex::new(&LikePattern::parse("ada").to_regex(true)).unwrap();
        assert!(re.is_match("ADA"));
        assert_eq!(
            LikePattern::parse("ÉMILE_x").to_ascii_lowercase().to_sql_like(),
            "Émile_x"
        );
    }

    #[test]
    fn test_folded_regexp() {
        assert_eq!(LikePattern::parse("Jo%").to_folded_regexp(), "[jJ][oO].*");
        assert_eq!(LikePattern::parse(r"a.b_1\%").to_folded_regexp(), r"[aA]\.[bB].1\%");
        assert_eq!(LikePattern::parse("é@").to_folded_regexp(), r"\é\@");
    }

    #[test]
    fn test_backend_forms() {
        let pattern = LikePattern::parse(r"a*b?_%\_");
        assert_eq!(pattern.to_wildcard(), r"a\*b\??*_");
        assert_eq!(pattern.to_glob(), "a[*]b[?]?*_");
        assert_eq!(pattern.to_sql_like(), r"a*b?_%\_");
        assert_eq!(LikePattern::parse("[x]").to_glob(), "[[]x]");
    }
}
