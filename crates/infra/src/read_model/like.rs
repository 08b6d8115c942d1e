//! `ILIKE` pattern evaluation for stores without a SQL engine.
//!
//! Semantics follow Postgres with the default escape character: `%` matches
//! any run of characters, `_` exactly one, and a backslash makes the next
//! character literal. Matching is case-insensitive.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyMany,
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            '%' => Token::AnyMany,
            '_' => Token::AnyOne,
            other => Token::Literal(other),
        });
    }
    tokens
}

/// Does `text` match `pattern` under `ILIKE`?
pub fn ilike(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let tokens = tokenize(&pattern.to_lowercase());

    let (mut t, mut p) = (0usize, 0usize);
    // Position of the last `%` and the text index it is currently absorbing up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::AnyMany) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(Token::AnyOne) => {
                t += 1;
                p += 1;
            }
            Some(Token::Literal(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star_p, star_t)) => {
                    backtrack = Some((star_p, star_t + 1));
                    p = star_p + 1;
                    t = star_t + 1;
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|tk| *tk == Token::AnyMany)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use storefront_catalog::SearchText;

    #[test]
    fn substring_match_is_case_insensitive() {
        assert!(ilike("Grade 4 Math", "%math%"));
        assert!(ilike("grade 4 math", "%MATH%"));
        assert!(!ilike("Grade 4 Science", "%math%"));
    }

    #[test]
    fn wildcards_behave_like_sql() {
        assert!(ilike("abc", "a_c"));
        assert!(!ilike("abbc", "a_c"));
        assert!(ilike("abbc", "a%c"));
        assert!(ilike("", "%"));
        assert!(!ilike("", "_"));
        assert!(ilike("aXbXc", "%b%c"));
    }

    #[test]
    fn escaped_wildcards_match_literally() {
        let pct = SearchText::parse("50%").unwrap().like_pattern();
        assert!(ilike("50% off bundle", &pct));
        assert!(!ilike("500 worksheets", &pct));

        let underscore = SearchText::parse("a_b").unwrap().like_pattern();
        assert!(ilike("file a_b.pdf", &underscore));
        assert!(!ilike("file axb.pdf", &underscore));
    }

    proptest! {
        /// An escaped search pattern is plain case-insensitive substring search.
        #[test]
        fn escaped_pattern_is_substring_search(
            text in "[a-zA-Z0-9 %_]{0,24}",
            needle in "[a-zA-Z0-9%_]{1,6}",
        ) {
            let pattern = SearchText::parse(&needle).unwrap().like_pattern();
            let expected = text.to_lowercase().contains(&needle.to_lowercase());
            prop_assert_eq!(ilike(&text, &pattern), expected);
        }
    }
}
