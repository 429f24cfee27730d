//! Tag management and resolution.

pub mod associations;
pub mod resolve;
pub mod store;

pub use resolve::{Resolution, TagResolver};
pub use store::{TagSort, TagStore, TagUpdate};
