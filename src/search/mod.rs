//! Search utilities for the gallery.
//!
//! A query like `cat -dog width:>500 safety:safe` goes through
//! [`tokens::tokenize`], then [`compile::compile`] turns the tokens into a
//! [`Predicate`], which [`execute::execute`] renders to SQL and runs.

pub mod compile;
pub mod details;
pub mod execute;
pub mod modifiers;
pub mod query;
pub mod sort;
pub mod tokens;

pub use compile::{compile, CompiledQuery};
pub use execute::{execute, search_posts, SearchPage, SearchRequest};
pub use modifiers::{Condition, PostFacts, Predicate};
pub use sort::{Paging, SortKey, SortOrder};
