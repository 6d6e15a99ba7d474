//! Search engine for a LIMS-style entity/property schema
//!
//! Turns user-composed criteria trees into parameterized PostgreSQL queries:
//! - Criteria search with type-checked property filters
//! - Stable, id-tie-broken ordering of id sets
//! - Two-phase global full-text search with rank reconciliation
//! - One-hop relationship expansion
//!
//! SQL runs through the [`db::SqlExecutor`] seam; [`db::PgExecutor`] is the `sqlx`
//! implementation.

#![allow(
    clippy::too_many_arguments,      // Builders pass aliases, binds and mapping pieces around
)]

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod search;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use search::SearchEngine;

pub use labsearch_criteria as criteria;
