//! Shared primitives for the LRC transcoding coordinator.
//!
//! This crate has no knowledge of racks, placement, or the wire codec; it
//! only defines the identifiers, schema parameters, error taxonomy, and
//! configuration shared by every other crate in the workspace.

pub mod checksum;
pub mod config;
pub mod error;
pub mod ids;
pub mod schema;

pub use checksum::BlockChecksum;
pub use config::CoordinatorConfig;
pub use error::{Error, Result};
pub use ids::{BlockId, BlockSeq, FileName, NodeId, StripeId, StripeSeq};
pub use schema::{CodeState, PlaceMethod, SchemaParams};
