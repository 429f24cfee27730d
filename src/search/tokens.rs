//! Splits a query string into typed tokens.
//!
//! There's no quoting. Terms are separated by whitespace, and each one is
//! classified on its own, except for `OR`, which is only an operator when it
//! has a term on both sides.

/// One whitespace-separated piece of a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `OR`, in any case, between two terms.
    Or,
    /// `cat`
    Tag(String),
    /// `-dog`
    NegatedTag(String),
    /// `width:>500`. The key is lowercased, the value is kept as written.
    Filter { key: String, value: String },
    /// `-safety:unsafe`
    NegatedFilter { key: String, value: String },
}

pub fn tokenize(query: &str) -> Vec<Token> {
    let terms = query.split_whitespace().collect::<Vec<_>>();
    let last = terms.len().saturating_sub(1);

    terms
        .iter()
        .enumerate()
        .map(|(i, term)| {
            if term.eq_ignore_ascii_case("or") && i != 0 && i != last {
                Token::Or
            } else {
                classify(term)
            }
        })
        .collect()
}

fn classify(term: &str) -> Token {
    if let Some(rest) = term.strip_prefix('-') {
        return match split_filter(rest) {
            Some((key, value)) => Token::NegatedFilter { key, value },
            None => Token::NegatedTag(rest.to_string()),
        };
    }

    match split_filter(term) {
        Some((key, value)) => Token::Filter { key, value },
        None => Token::Tag(term.to_string()),
    }
}

/// Splits on the first `:`.
fn split_filter(term: &str) -> Option<(String, String)> {
    term.split_once(':')
        .map(|(key, value)| (key.to_lowercase(), value.to_string()))
}
