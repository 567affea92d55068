//! Shared types for the OnThesis analyst-agent client.
//!
//! Every other crate in the workspace depends on this one for the
//! conversation data model, the wire event taxonomy, the error type,
//! and configuration.

pub mod config;
pub mod dataset;
pub mod error;
pub mod event;
pub mod message;
pub mod stream;
pub mod trace;

pub use dataset::{Dataset, DatasetHandle};
pub use error::{Error, Result};
pub use event::{AgentEvent, StepPatch};
pub use message::{Message, MessageState, Role, Step, StepStatus};
