//! Vehicle Data Client Library
//!
//! Provides a typed HTTP client for the manufacturer's vehicle data API and
//! implements [`VehicleBackend`] on top of it.
//!
//! # Example
//!
//! ```rust,no_run
//! use mecar_client::MeClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MeClient::with_bearer_token(mecar_client::DEFAULT_BASE_URL, "token")?;
//!
//!     let fuel = client.fuel_status("WDD2054231F123456").await?;
//!     println!("{} record(s)", fuel.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides an in-memory vendor API and a test server:
//!
//! ```rust,ignore
//! use mecar_client::testing::{MockVendor, TestServer};
//!
//! let vendor = MockVendor::new();
//! let server = TestServer::start(vendor.router()).await?;
//! let fuel = server.client.fuel_status("VIN").await?;
//! ```
//!
//! [`VehicleBackend`]: mecar_core::VehicleBackend

mod backend;
mod client;
mod error;
pub mod testing;

pub use client::{Container, MeClient, DEFAULT_BASE_URL};
pub use error::{ClientError, Result};

// Re-export core types for convenience
pub use mecar_core::{Snapshot, TelemetryRecord};
