//! House configuration with sensible defaults.
//!
//! [`HouseConfig`] captures what the `dwell` binary needs and converts it
//! into `dwell` types via [`build_session_config`](HouseConfig::build_session_config)
//! and [`build_rooms`](HouseConfig::build_rooms).

use std::path::{Path, PathBuf};

use dwell::agent::config::SessionConfig;
use dwell::context::compaction::CompactionConfig;
use dwell::rooms::RoomRegistry;

use crate::prompt::resident_system_prompt;
use crate::rooms::{BEDROOM, build_house};

/// Configuration for one resident of the house.
#[derive(Debug, Clone)]
pub struct HouseConfig {
    /// Agent identifier, also the resident's name. Default: `"resident"`.
    pub agent_id: String,
    /// Model identifier. Default: `"anthropic/claude-sonnet-4"`.
    pub model: String,
    /// Tokens per day. Default: `500_000`.
    pub total_budget: u64,
    /// Remaining tokens at which the resident is told to wind down. Default: `50_000`.
    pub warning_threshold: u64,
    /// Maximum tokens per model response. Default: `4096`.
    pub max_tokens: u32,
    /// Context window of `model`, for compaction. Default: `200_000`.
    pub context_window: u64,
    /// Room the resident wakes in. Default: `"bedroom"`.
    pub start_room: String,
    /// Directory for transcripts and letters. Default: `".dwell"`.
    pub home: PathBuf,
}

impl Default for HouseConfig {
    fn default() -> Self {
        Self {
            agent_id: "resident".to_string(),
            model: "anthropic/claude-sonnet-4".to_string(),
            total_budget: 500_000,
            warning_threshold: 50_000,
            max_tokens: 4096,
            context_window: 200_000,
            start_room: BEDROOM.to_string(),
            home: PathBuf::from(".dwell"),
        }
    }
}

impl HouseConfig {
    /// Build a [`SessionConfig`] for one day in the house.
    pub fn build_session_config(&self) -> SessionConfig {
        SessionConfig::new(self.model.clone(), resident_system_prompt(&self.agent_id))
            .with_budget(self.total_budget, self.warning_threshold)
            .with_start_room(self.start_room.clone())
            .with_max_tokens(self.max_tokens)
            .with_compaction(CompactionConfig::new().with_context_window(self.context_window))
    }

    /// All rooms of the house, with fresh state.
    pub fn build_rooms(&self) -> RoomRegistry {
        build_house()
    }

    pub fn transcripts_dir(&self) -> PathBuf {
        self.home.join("transcripts")
    }

    pub fn letters_dir(&self) -> PathBuf {
        self.home.join("letters")
    }

    /// File holding room state between runs.
    pub fn rooms_file(&self) -> PathBuf {
        self.home.join("rooms.json")
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_wake_in_the_bedroom() {
        let config = HouseConfig::default();
        let session = config.build_session_config();
        assert_eq!(session.start_room, "bedroom");
        assert_eq!(session.total_budget, 500_000);
        assert_eq!(session.max_tokens, Some(4096));
        assert!(session.system_prompt.starts_with("You are resident,"));
    }

    #[test]
    fn start_room_exists_in_the_house() {
        let config = HouseConfig::default();
        assert!(config.build_rooms().contains(&config.start_room));
    }

    #[test]
    fn directories_live_under_home() {
        let config = HouseConfig {
            home: PathBuf::from("/tmp/house"),
            ..Default::default()
        };
        assert_eq!(config.transcripts_dir(), Path::new("/tmp/house/transcripts"));
        assert_eq!(config.letters_dir(), Path::new("/tmp/house/letters"));
    }
}
