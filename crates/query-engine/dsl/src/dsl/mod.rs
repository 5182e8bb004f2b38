//! The archival query language: the request shapes a client sends before they are
//! compiled into native fragments.

pub mod action;
pub mod error;
pub mod facet;
pub mod filter;
pub mod parse;
pub mod projection;
pub mod query;
pub mod request;
pub mod tokens;
