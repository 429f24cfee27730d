use sea_query::*;

use super::{
    details::Comparison,
    modifiers::{Condition, Predicate, ToQuery},
};

/// the posts table
#[derive(Clone, Copy, Iden)]
pub enum Posts {
    Table,
    Id,
    Extension,
    FileSize,
    Width,
    Height,
    Safety,
    CreatedAt,
}

/// the post <-> tag junction
#[derive(Clone, Copy, Iden)]
pub enum PostTags {
    Table,
    PostId,
    TagId,
}

#[derive(Clone, Copy, Iden)]
pub enum Tags {
    Table,
    Id,
    Name,
}

#[derive(Clone, Copy, Iden)]
pub enum Favorites {
    Table,
    PostId,
}

/// the pool <-> post junction
#[derive(Clone, Copy, Iden)]
pub enum PoolPosts {
    Table,
    PoolId,
    PostId,
}

fn compare(col: Posts, cmp: Comparison, px: i64) -> SimpleExpr {
    let c = || Expr::col((Posts::Table, col));

    // posts without known dimensions never pass, even when negated into a
    // `NOT`, which would otherwise leave a NULL behind
    c().is_not_null().and(match cmp {
        Comparison::Less => c().lt(px),
        Comparison::LessOrEqual => c().lte(px),
        Comparison::Equal => c().eq(px),
        Comparison::GreaterOrEqual => c().gte(px),
        Comparison::Greater => c().gt(px),
    })
}

impl ToQuery for Condition {
    #[tracing::instrument]
    fn to_query(self) -> SimpleExpr {
        let post_id = || Expr::col((Posts::Table, Posts::Id));

        match self {
            Condition::HasTag(name) => {
                tracing::debug!("Looking for posts tagged `{name}`.");
                post_id().in_subquery(
                    Query::select()
                        .column((PostTags::Table, PostTags::PostId))
                        .from(PostTags::Table)
                        .inner_join(
                            Tags::Table,
                            Expr::col((Tags::Table, Tags::Id))
                                .equals((PostTags::Table, PostTags::TagId)),
                        )
                        .and_where(Expr::col((Tags::Table, Tags::Name)).eq(name))
                        .to_owned(),
                )
            }

            Condition::Safety(safety) => {
                Expr::col((Posts::Table, Posts::Safety)).eq(safety.as_str())
            }

            Condition::Width(cmp, px) => compare(Posts::Width, cmp, px),
            Condition::Height(cmp, px) => compare(Posts::Height, cmp, px),

            Condition::Favorite(wanted) => {
                let favorites = Query::select()
                    .column(Favorites::PostId)
                    .from(Favorites::Table)
                    .to_owned();

                if wanted {
                    post_id().in_subquery(favorites)
                } else {
                    post_id().not_in_subquery(favorites)
                }
            }

            Condition::Pool(pool_id) => post_id().in_subquery(
                Query::select()
                    .column(PoolPosts::PostId)
                    .from(PoolPosts::Table)
                    .and_where(Expr::col(PoolPosts::PoolId).eq(pool_id))
                    .to_owned(),
            ),

            Condition::Kind(kind) => {
                tracing::debug!("Checking by kind: `{kind:?}`");
                Expr::col((Posts::Table, Posts::Extension)).is_in(kind.extensions().iter().copied())
            }
        }
    }
}

impl Predicate {
    /// Renders the predicate as a `WHERE` condition over the `posts` table.
    pub fn to_cond(&self) -> Cond {
        match self {
            Predicate::All(preds) => preds
                .iter()
                .fold(Cond::all(), |cond, pred| cond.add(pred.to_cond())),
            Predicate::Any(preds) => preds
                .iter()
                .fold(Cond::any(), |cond, pred| cond.add(pred.to_cond())),
            Predicate::Not(pred) => Cond::all().add(pred.to_cond()).not(),
            Predicate::Condition(cond) => Cond::all().add(cond.clone().to_query()),
        }
    }
}
