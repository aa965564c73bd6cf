//! Flight-search provider plugins.

pub mod google;
pub mod parse;
