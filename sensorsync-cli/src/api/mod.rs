//! ServiceNow Table API client
//!
//! CRUD over the two destination tables plus the sensor-type lookup table.
//! The reconciler talks to the store through the `RecordStore` trait so tests
//! can substitute an in-memory implementation.

pub mod client;
pub mod models;
pub mod store;

pub use client::ServiceNowClient;
pub use models::{field_str, record_sys_id};
pub use store::RecordStore;
