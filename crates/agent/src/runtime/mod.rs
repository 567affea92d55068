pub mod cancel;
pub mod gate;
pub mod turn;

pub use cancel::{CancelMap, CancelToken};
pub use gate::{Claim, TurnBusy, TurnGate, TurnPermit};
pub use turn::{run_turn, NoticeLevel, TurnHandle, TurnInput, TurnOutcome, TurnUpdate};
