pub mod app;
pub mod client;
pub mod error;
pub mod ingest;
pub mod routes;
pub mod scheduler;
pub mod state;
