//! Search translation and execution
//!
//! - `context`: per-request translation input and authorisation
//! - `translate`: criteria tree to `SELECT DISTINCT` id query
//! - `order`: ordering of a pre-filtered id set
//! - `global`: two-phase global full-text search
//! - `relationship`: one-hop parent/child expansion
//! - `engine`: the facade tying these to an executor

pub mod context;
pub mod engine;
pub mod global;
pub mod order;
pub mod query_builder;
pub mod relationship;
pub mod translate;

pub use context::{AuthorisationInformation, TranslationContext};
pub use engine::SearchEngine;
pub use order::translate_order;
pub use query_builder::{BindValue, SelectQuery};
pub use translate::translate;
