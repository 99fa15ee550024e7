//! The house: a bedroom, a hallway, a study and a garden.
//!
//! ```text
//!   bedroom ── hallway ── study
//!                 │
//!               garden
//! ```
//!
//! The hallway connects to every room; the others only lead back to it.

pub mod bedroom;
pub mod garden;
pub mod persist;
pub mod study;

use dwell::rooms::{Room, RoomRegistry};

pub const BEDROOM: &str = "bedroom";
pub const HALLWAY: &str = "hallway";
pub const STUDY: &str = "study";
pub const GARDEN: &str = "garden";

pub use bedroom::bedroom;
pub use garden::garden;
pub use persist::{load_states, save_states};
pub use study::study;

pub fn hallway() -> Room {
    Room::new(HALLWAY, "Hallway")
        .with_description("A long hallway with a coat rack and a pile of post by the door.")
}

/// A registry holding every room of the house.
pub fn build_house() -> RoomRegistry {
    RoomRegistry::new()
        .with_room(bedroom())
        .with_room(hallway())
        .with_room(study())
        .with_room(garden())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_room_is_reachable_through_the_hallway() {
        let house = build_house();
        assert_eq!(house.room_ids(), [BEDROOM, HALLWAY, STUDY, GARDEN]);
        for room in [BEDROOM, STUDY, GARDEN] {
            assert!(house.can_transition(HALLWAY, room));
            assert!(house.can_transition(room, HALLWAY));
        }
        assert!(!house.can_transition(BEDROOM, GARDEN));
    }

    #[test]
    fn stateful_rooms_start_empty() {
        let house = build_house();
        assert!(house.room_state(STUDY).unwrap().is_empty());
        assert!(house.room_state(GARDEN).unwrap().is_empty());
        assert!(house.room_state(BEDROOM).is_none());
    }
}
