//! The lifecycle protocol and the retrieval engine built on the store seam.

pub mod admin;
pub mod batch;
pub mod cursor;
pub mod generation;
pub mod indexer;
pub mod search;
pub mod versioned;
