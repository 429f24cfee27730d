//! Types that are really the bedrock of the app.

pub mod pool;
pub mod post;
pub mod tags;
