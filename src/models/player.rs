//! Player identity and cosmetics.

use serde::{Deserialize, Serialize};

/// Connection-scoped player identifier (server-issued UUID string).
pub type PlayerId = String;

/// Identifier used for the synthetic CPU opponent.
pub const CPU_ID: &str = "cpu";

/// Fighter colors chosen at creation. Opaque to the server; only the
/// client renderer interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cosmetics {
    pub hair_color: String,
    pub skin_color: String,
    pub eye_color: String,
    pub gi_color: String,
}

impl Default for Cosmetics {
    /// The CPU palette.
    fn default() -> Self {
        Self {
            hair_color: "#464d56".to_string(),
            skin_color: "#81c2e4".to_string(),
            eye_color: "#ff0000".to_string(),
            gi_color: "#1b4478".to_string(),
        }
    }
}

/// A tournament participant. The authoritative record lives in the room
/// roster; battles reference players by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(flatten)]
    pub cosmetics: Cosmetics,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, cosmetics: Cosmetics) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cosmetics,
        }
    }

    /// The synthetic opponent filling a bye slot.
    pub fn cpu() -> Self {
        Self::new(CPU_ID, "CPU", Cosmetics::default())
    }

    pub fn is_cpu(&self) -> bool {
        self.id == CPU_ID
    }
}
