//! Core data models for the tournament server.

mod battle;
mod bracket;
mod player;
mod room;

pub use battle::*;
pub use bracket::*;
pub use player::*;
pub use room::*;
