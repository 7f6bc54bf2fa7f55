//! HTTP request handlers for the bridge API

pub mod accessories;
pub mod characteristics;
