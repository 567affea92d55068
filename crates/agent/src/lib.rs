//! Turn runtime and command-line front end for the OnThesis analyst agent.

pub mod cli;
pub mod runtime;
pub mod state;

pub use runtime::{run_turn, NoticeLevel, TurnHandle, TurnInput, TurnOutcome, TurnUpdate};
pub use state::AgentState;
