//! # IO Module
//!
//! Adapter layer between HTTP clients and the domain services.
//!
//! Handlers translate requests into service calls and service results into
//! the JSON envelope every endpoint shares (`{success, data, error,
//! message}`). Domain errors map onto status codes here and nowhere else.

pub mod rest;

pub use rest::*;
