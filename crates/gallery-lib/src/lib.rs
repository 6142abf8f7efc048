//! Core library for the media gallery service
//!
//! This crate provides:
//! - Bearer token identity resolution
//! - The process health sampler and its rolling histories
//! - Resource probes and corrective-action collectors
//! - Health checks and observability

pub mod auth;
pub mod gc;
pub mod health;
pub mod models;
pub mod observability;
pub mod probe;
pub mod sampler;

pub use auth::{AuthError, Identity, IdentityVerifier, JwtVerifier};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{GalleryMetrics, StructuredLogger};
pub use sampler::{HealthSampler, SamplerConfig, SamplerLoop, Thresholds, Tier, Trigger};
