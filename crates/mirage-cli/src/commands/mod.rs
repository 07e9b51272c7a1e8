//! CLI command implementations for Mirage.

pub mod docs;
pub mod endpoints;
pub mod schema;
pub mod serve;
