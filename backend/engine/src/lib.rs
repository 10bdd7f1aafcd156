//! The EmberChat turn pipeline: stream relay and turn controller.
//!
//! `relay` filters structured reasoning spans out of the incremental token
//! stream; `turn` drives one request/response cycle from user text to a
//! finalized, persisted exchange.

pub mod relay;
pub mod turn;

pub use relay::{strip_reasoning, ThinkFilter};
pub use turn::{derive_title, TurnController, TurnOptions, TurnOutcome, TurnPhase, TurnResult};
