//! The media collection: items, their list queries, and owned-item statistics.

pub mod dto;
pub mod models;
pub mod query;
pub mod service;

pub use service::CollectionService;
