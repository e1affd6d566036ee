//! Domain models for fabrication operations

mod part;
mod project;
mod purchase_order;
mod sales_order;

pub use part::*;
pub use project::*;
pub use purchase_order::*;
pub use sales_order::*;
