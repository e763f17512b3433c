//! `glasserp-core`: shared domain building blocks for the glass ERP.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the error model, strongly-typed identifiers and the optimistic-concurrency
//! vocabulary used by versioned records.

pub mod entity;
pub mod error;
pub mod id;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, StructureId, ZaloOrderId};
pub use version::{ExpectedVersion, Versioned};
