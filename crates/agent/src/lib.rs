//! The DermaChat question-answering core.
//!
//! A session resolves its patient context once, then every submission runs
//! the same linear pipeline:
//!
//! 1. **Embed** the dermatologist's question
//! 2. **Retrieve** the closest reference passages from the vector index
//! 3. **Compose** one prompt from patient context, passages and question
//! 4. **Generate** the answer and append both turns to the transcript

pub mod context;
pub mod pipeline;
pub mod prompt;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{QueryParamSource, RemoteSource, StaticSource, source_for};
pub use pipeline::{RagAnswer, RagPipeline, join_passages};
pub use session::{ChatSession, SessionState, SubmitOutcome};
