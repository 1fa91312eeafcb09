//! # DermaChat Core
//!
//! Domain types, traits, and error definitions for the DermaChat treatment
//! assistant. This crate has **zero framework dependencies**: it defines the
//! domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Each outbound service (embeddings, vector index, generative model) and the
//! patient context source is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Selecting implementations via configuration
//! - Testing the pipeline with scripted stubs
//! - A clean dependency graph (all crates depend inward on core)

pub mod context;
pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use context::{ContextSource, PatientContext, ResolvedContext};
pub use error::{Error, Result};
pub use message::{Role, SessionId, Turn};
pub use provider::{Embedder, Generator, MetadataFilter, PassageRetriever, RetrievalQuery};
