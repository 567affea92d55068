//! HTTP side of the analyst agent: the turn stream, the one-shot dataset
//! upload, and the non-streaming copilot call.
//!
//! Each concern is a trait with a `reqwest` implementation so the runtime
//! can be driven by scripted fakes in tests.

pub mod copilot;
pub mod csv;
pub mod transport;
pub mod upload;
pub(crate) mod util;

pub use copilot::{CopilotClient, CopilotReply, CopilotRequest, HttpCopilot};
pub use transport::{ChunkSource, HttpTransport, StreamTransport, TurnRequest};
pub use upload::{DatasetUploader, HttpUploader};
