use std::collections::BTreeSet;

use sea_query::SimpleExpr;

use crate::models::{
    pool::PoolId,
    post::{Post, PostKind, Safety},
};

use super::details::Comparison;

/// One test against a single post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    /// The post carries a tag with exactly this name. No alias or
    /// implication lookups happen here.
    HasTag(String),
    Safety(Safety),
    Width(Comparison, i64),
    Height(Comparison, i64),
    /// `true` for favorited posts, `false` for the rest.
    Favorite(bool),
    Pool(PoolId),
    Kind(PostKind),
}

/// A compiled query: a boolean tree over [`Condition`]s.
///
/// `All(vec![])` matches everything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
    Condition(Condition),
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::All(Vec::new())
    }
}

impl From<Condition> for Predicate {
    fn from(value: Condition) -> Self {
        Predicate::Condition(value)
    }
}

impl Predicate {
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Evaluates the predicate against a post we already have in memory.
    ///
    /// This agrees with the SQL rendition, including for posts with no
    /// known dimensions: a dimension test on those is false, and negating
    /// it is true.
    pub fn matches(&self, post: &PostFacts) -> bool {
        match self {
            Predicate::All(preds) => preds.iter().all(|p| p.matches(post)),
            Predicate::Any(preds) => preds.iter().any(|p| p.matches(post)),
            Predicate::Not(pred) => !pred.matches(post),
            Predicate::Condition(cond) => cond.matches(post),
        }
    }
}

impl Condition {
    pub fn matches(&self, post: &PostFacts) -> bool {
        match self {
            Condition::HasTag(name) => post.tags.contains(name),
            Condition::Safety(safety) => post.safety == *safety,
            Condition::Width(cmp, px) => post.width.is_some_and(|w| cmp.holds(w, *px)),
            Condition::Height(cmp, px) => post.height.is_some_and(|h| cmp.holds(h, *px)),
            Condition::Favorite(wanted) => post.favorited == *wanted,
            Condition::Pool(id) => post.pools.contains(id),
            Condition::Kind(kind) => kind.extensions().contains(&post.extension.as_str()),
        }
    }
}

/// What a predicate needs to know about a post to evaluate it in memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostFacts {
    pub tags: BTreeSet<String>,
    pub safety: Safety,
    pub width: Option<i64>,
    pub height: Option<i64>,
    /// Dotted and lowercase, like `.png`.
    pub extension: String,
    pub favorited: bool,
    pub pools: BTreeSet<PoolId>,
}

impl PostFacts {
    /// Takes what a hydrated [`Post`] knows. Pool memberships aren't part of
    /// a post, so add them with [`PostFacts::in_pools`].
    pub fn from_post(post: &Post) -> Self {
        Self {
            tags: post.tags.iter().cloned().collect(),
            safety: post.safety,
            width: post.width,
            height: post.height,
            extension: post.extension.clone(),
            favorited: post.is_favorited,
            pools: BTreeSet::new(),
        }
    }

    pub fn in_pools(mut self, pools: impl IntoIterator<Item = PoolId>) -> Self {
        self.pools.extend(pools);
        self
    }
}

/// A modifier must become a query to be used.
pub trait ToQuery {
    /// Converts the modifier into a clause for querying the `posts` table.
    fn to_query(self) -> SimpleExpr;
}
