//! External API integrations

pub mod bookkeeping;

pub use bookkeeping::BookkeepingClient;
