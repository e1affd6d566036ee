//! HTTP request handlers

pub mod cutting;
pub mod health;
pub mod inventory;
pub mod purchase_order;
pub mod purchasing;
pub mod sales_order;

pub use cutting::*;
pub use health::*;
pub use inventory::*;
pub use purchase_order::*;
pub use purchasing::*;
pub use sales_order::*;
