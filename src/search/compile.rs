//! Turns a query string into a [`Predicate`].
//!
//! Compilation never fails. Terms it can't make sense of (unknown filter
//! keys, values that don't parse) just don't add a condition.

use core::mem;

use crate::models::post::{PostKind, Safety};

use super::{
    details::{is_truthy, Comparison, FilterKey},
    modifiers::{Condition, Predicate},
    sort::SortKey,
    tokens::{tokenize, Token},
};

/// A compiled query, plus the sort it asked for (if any).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledQuery {
    pub predicate: Predicate,
    /// From a `sort:<key>` term. The last one wins.
    pub sort: Option<SortKey>,
}

/// What the previous token left behind, for `OR` to bind to.
enum Last {
    Nothing,
    /// An operand that `OR` may still bind, by its index in the clauses.
    Operand(usize),
    /// `OR` right after an operand. The next operand joins it.
    Or(usize),
}

#[tracing::instrument]
pub fn compile(query: &str) -> CompiledQuery {
    let mut compiled = CompiledQuery::default();
    let mut clauses: Vec<Predicate> = Vec::new();
    let mut last = Last::Nothing;

    for token in tokenize(query) {
        let operand = match token {
            Token::Or => {
                last = match last {
                    Last::Operand(i) => Last::Or(i),
                    _ => Last::Nothing,
                };
                continue;
            }

            Token::Tag(name) => Some(Condition::HasTag(name).into()),

            // these are never `OR` operands
            Token::NegatedTag(name) => {
                if !name.is_empty() {
                    clauses.push(Predicate::from(Condition::HasTag(name)).not());
                }
                last = Last::Nothing;
                continue;
            }

            Token::Filter { key, value } => match FilterKey::parse(&key) {
                Some(FilterKey::Sort) => {
                    compiled.sort = Some(SortKey::parse(&value));
                    None
                }
                Some(key) => filter(key, &value).map(Predicate::from),
                None => {
                    tracing::debug!("Ignoring unknown filter key `{key}`.");
                    None
                }
            },

            Token::NegatedFilter { key, value } => match FilterKey::parse(&key) {
                Some(FilterKey::Sort) | None => None,
                Some(key) => filter(key, &value).map(|cond| Predicate::from(cond).not()),
            },
        };

        let Some(operand) = operand else {
            last = Last::Nothing;
            continue;
        };

        last = match last {
            Last::Or(i) => {
                let left = mem::take(&mut clauses[i]);
                clauses[i] = Predicate::Any(vec![left, operand]);
                Last::Nothing
            }
            _ => {
                clauses.push(operand);
                Last::Operand(clauses.len() - 1)
            }
        };
    }

    compiled.predicate = Predicate::All(clauses);
    compiled
}

/// Makes a condition out of a filter, or nothing if the value doesn't fit.
fn filter(key: FilterKey, raw_value: &str) -> Option<Condition> {
    let (cmp, value) = Comparison::split(raw_value);
    let cmp = if key.is_ordered() {
        cmp
    } else {
        Comparison::Equal
    };

    let cond = match key {
        FilterKey::Safety => Safety::parse(value).map(Condition::Safety),
        FilterKey::Width => value.trim().parse().ok().map(|px| Condition::Width(cmp, px)),
        FilterKey::Height => value.trim().parse().ok().map(|px| Condition::Height(cmp, px)),
        FilterKey::Favorite => Some(Condition::Favorite(is_truthy(value))),
        FilterKey::Pool => value.trim().parse().ok().map(Condition::Pool),
        FilterKey::Kind => PostKind::parse(value).map(Condition::Kind),
        FilterKey::Sort => None,
    };

    if cond.is_none() {
        tracing::debug!("Filter value `{raw_value}` doesn't fit `{key:?}`. Ignoring it.");
    }
    cond
}
