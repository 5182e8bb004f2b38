//! The document store's native query representation.

pub mod ast;
pub mod convert;
pub mod helpers;
