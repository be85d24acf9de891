//! Value types exchanged between callers, the lifecycle layer and the store.
//!
//! None of these carry behaviour beyond validation and conversion; they are
//! plain data that serialize naturally via `serde`.

pub mod bucket;
pub mod document;
pub mod index;
pub mod page;
pub mod query;
