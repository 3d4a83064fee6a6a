//! Backend API layer.
//!
//! - [`ApiClient`]: reqwest-based JSON client; every call passes the auth gate
//! - [`models`]: typed request/response schemas validated at the boundary
//! - Typed endpoint methods on [`ApiClient`] (employees, invoices, payments,
//!   reports)

mod client;
mod endpoints;
pub mod models;

pub use client::{error_message, ApiClient, DEFAULT_TIMEOUT};
