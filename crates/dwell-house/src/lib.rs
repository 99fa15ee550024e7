//! A small house for a `dwell` agent.
//!
//! `dwell-house` provides a ready-to-use home built on the `dwell` session
//! runtime: four rooms with their own tools, a system prompt for the
//! resident, and a [`LetterBox`] inbox backed by a directory of files.
//!
//! # Library usage
//!
//! ```ignore
//! use dwell::prelude::*;
//! use dwell_house::{HouseConfig, LetterBox};
//!
//! let config = HouseConfig::default();
//! let mut rooms = config.build_rooms();
//! let store = FileStore::new(config.transcripts_dir())?;
//! let letters = LetterBox::new(config.letters_dir());
//!
//! let outcome = SessionRunner::new(&client, &store, &mut rooms, config.build_session_config())
//!     .with_inbox(&letters)
//!     .run(&config.agent_id)
//!     .await?;
//! ```
//!
//! # Binary
//!
//! ```sh
//! OPENROUTER_KEY=... dwell --agent wren --budget 200000
//! ```

pub mod config;
pub mod inbox;
pub mod prompt;
pub mod rooms;

pub use config::HouseConfig;
pub use inbox::LetterBox;
pub use prompt::resident_system_prompt;
pub use rooms::build_house;
