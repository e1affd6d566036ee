//! Shared domain logic for the fabrication operations platform
//!
//! Pure types and calculations used by the backend and, through WASM, by the
//! purchasing screens. Nothing in this crate touches the database.

pub mod bom;
pub mod cutting;
pub mod demand;
pub mod ledger_math;
pub mod models;
pub mod shortage;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
