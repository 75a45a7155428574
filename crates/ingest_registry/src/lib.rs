//! Service discovery and the base microservice client (spec §4.4):
//! resolves ASR/captioning/embedding microservices, retries transient
//! failures with exponential backoff, and brackets model load/unload
//! around a unit of work.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod registry;
mod scoped;

pub use client::{ClientOverrides, ServiceClient, ServiceStatus};
pub use registry::{HttpServiceRegistry, ServiceRegistry};
pub use scoped::scoped_model;
