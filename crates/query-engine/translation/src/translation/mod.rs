//! Translate an archival request into native document store fragments.

pub mod error;
pub mod helpers;
pub mod query;
