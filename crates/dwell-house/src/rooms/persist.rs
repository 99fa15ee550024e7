//! Room state on disk, so the house remembers between runs of the binary.
//!
//! One JSON object keyed by room id. Rooms without state are left out, and
//! entries for rooms the house no longer has are ignored on load.

use dwell::rooms::{RoomRegistry, RoomState};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Merge saved state into `rooms`. A missing file is not an error.
pub async fn load_states(rooms: &mut RoomRegistry, path: &Path) -> std::io::Result<usize> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let saved: BTreeMap<String, RoomState> = serde_json::from_str(&text)?;

    let mut loaded = 0;
    for (id, state) in saved {
        if rooms.room_state(&id).is_none() {
            warn!("Skipping saved state for room {id}: not a stateful room in this house");
            continue;
        }
        rooms.update_room_state(&id, state);
        loaded += 1;
    }
    debug!("Loaded state for {loaded} room(s) from {}", path.display());
    Ok(loaded)
}

/// Write every stateful room's state, replacing the file atomically.
pub async fn save_states(rooms: &RoomRegistry, path: &Path) -> std::io::Result<()> {
    let states: BTreeMap<&str, &RoomState> = rooms
        .room_ids()
        .into_iter()
        .filter_map(|id| rooms.room_state(id).map(|s| (id, s)))
        .collect();
    let json = serde_json::to_string_pretty(&states)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Saved state for {} room(s) to {}", states.len(), path.display());
    Ok(())
}
