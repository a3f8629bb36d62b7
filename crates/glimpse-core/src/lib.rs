pub mod analytics;
pub mod beacon;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod identity;
pub mod metrics;
pub mod session;
