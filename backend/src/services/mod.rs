//! Business logic services for inventory reservation and material planning

pub mod alerts;
pub mod bom;
pub mod catalog;
pub mod demand;
pub mod ledger;
pub mod purchase_summary;
pub mod purchasing;
pub mod sales_order;

pub use alerts::AlertService;
pub use demand::DemandService;
pub use purchase_summary::PurchaseSummaryService;
pub use purchasing::PurchasingService;
pub use sales_order::SalesOrderService;
