//! Wire protocol of the analyst-agent stream.
//!
//! Bytes go through three stages, each usable on its own:
//! - [`FrameDecoder`] -- split the byte stream into `data: ` frames
//! - [`parse_event`] -- turn a frame payload into an [`AgentEvent`](ot_domain::AgentEvent)
//! - [`apply`] -- fold an event into the evolving [`Message`](ot_domain::Message)
//!
//! [`MessageFold`] chains all three for one turn.

pub mod fold;
pub mod frame;
pub mod parse;
pub mod reduce;

pub use fold::{FoldStats, MessageFold};
pub use frame::{Frame, FrameDecoder};
pub use parse::{parse_event, ParseError};
pub use reduce::apply;
