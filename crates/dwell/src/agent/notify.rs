//! Text the loop injects into the transcript: the wake message, the
//! per-turn notification, and the "where you are" prompt section.
//!
//! A turn produces at most one notification message. Everything the agent
//! should notice at the end of a turn (arriving in a room, the budget
//! warning, new mail) is collected into a [`Notification`] and rendered as
//! a single user message.

use crate::rooms::RoomRegistry;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`Inbox::unread_count`].
pub type InboxFuture<'a> = Pin<Box<dyn Future<Output = Result<usize, String>> + Send + 'a>>;

/// Source of the agent's unread-message count.
///
/// Optional. Failures are logged and skipped; they never end a session.
pub trait Inbox: Send + Sync {
    fn unread_count<'a>(&'a self, agent_id: &'a str) -> InboxFuture<'a>;
}

/// Parts of one end-of-turn notification, rendered in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    parts: Vec<String>,
}

impl Notification {
    pub fn new() -> Self {
        Self::default()
    }

    /// The agent just walked into a room.
    pub fn room_entry(&mut self, name: &str, description: &str, atmosphere: Option<&str>) {
        self.parts.push(arrival(name, description, atmosphere, "You enter"));
    }

    pub fn budget_warning(&mut self, notice: impl Into<String>) {
        self.parts.push(notice.into());
    }

    pub fn inbox(&mut self, unread: usize) {
        self.parts.push(unread_line(unread));
    }

    /// The model neither called a tool nor is going to sleep.
    pub fn idle(&mut self, room_name: &str) {
        self.parts.push(format!(
            "[Nothing happens. You are still in the {room_name}. Use your tools to do \
             something, or go to sleep if you are done for the day.]"
        ));
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The message text, or `None` when there is nothing to say.
    pub fn render(&self) -> Option<String> {
        (!self.parts.is_empty()).then(|| self.parts.join("\n\n"))
    }
}

fn arrival(name: &str, description: &str, atmosphere: Option<&str>, verb: &str) -> String {
    let mut text = format!("[{verb} the {name}.]");
    if !description.is_empty() {
        text.push('\n');
        text.push_str(description);
    }
    if let Some(atmosphere) = atmosphere.filter(|a| !a.is_empty()) {
        text.push('\n');
        text.push_str(atmosphere);
    }
    text
}

fn unread_line(unread: usize) -> String {
    match unread {
        1 => "[You have 1 unread letter.]".to_string(),
        n => format!("[You have {n} unread letters.]"),
    }
}

/// Inputs for [`wake_message`].
#[derive(Debug, Clone, Copy)]
pub struct Wake<'a> {
    pub session_number: u32,
    pub room_name: &'a str,
    pub description: &'a str,
    pub atmosphere: Option<&'a str>,
    /// Summary the previous session left behind.
    pub previous_summary: Option<&'a str>,
    pub unread: Option<usize>,
}

/// First message of a session.
pub fn wake_message(wake: Wake<'_>) -> String {
    let mut parts = vec![if wake.session_number <= 1 {
        "[You wake up for the first time.]".to_string()
    } else {
        format!("[You wake up. This is day {}.]", wake.session_number)
    }];
    if let Some(summary) = wake.previous_summary.filter(|s| !s.trim().is_empty()) {
        parts.push(format!("[What you remember from last time]\n{}", summary.trim()));
    }
    parts.push(arrival(
        wake.room_name,
        wake.description,
        wake.atmosphere,
        "You are in",
    ));
    if let Some(unread) = wake.unread.filter(|n| *n > 0) {
        parts.push(unread_line(unread));
    }
    parts.join("\n\n")
}

/// System-prompt section describing the current room and its exits.
pub fn location_section(rooms: &RoomRegistry, room_id: &str) -> String {
    let name = rooms.display_name(room_id);
    let description = rooms.describe(room_id).unwrap_or_default();
    let exits = rooms.reachable_from(room_id);

    let mut section = format!("## Where you are\n\nYou are in the {name} ({room_id}).");
    if !description.is_empty() {
        section.push('\n');
        section.push_str(&description);
    }
    section.push_str("\n\n");
    if exits.is_empty() {
        section.push_str("There is nowhere to go from here.");
    } else {
        section.push_str(&format!("From here you can go to: {}.", exits.join(", ")));
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::Room;

    #[test]
    fn empty_notification_renders_nothing() {
        assert_eq!(Notification::new().render(), None);
    }

    #[test]
    fn parts_are_combined_in_order() {
        let mut n = Notification::new();
        n.room_entry("Garden", "Rows of tomatoes.", Some("Bees hum."));
        n.budget_warning("[Budget notice: low]");
        n.inbox(2);

        assert_eq!(
            n.render().unwrap(),
            "[You enter the Garden.]\nRows of tomatoes.\nBees hum.\n\n\
             [Budget notice: low]\n\n[You have 2 unread letters.]"
        );
    }

    #[test]
    fn wake_carries_previous_summary() {
        let text = wake_message(Wake {
            session_number: 4,
            room_name: "Bedroom",
            description: "Morning light.",
            atmosphere: None,
            previous_summary: Some("You planted basil."),
            unread: Some(1),
        });
        assert!(text.starts_with("[You wake up. This is day 4.]"));
        assert!(text.contains("[What you remember from last time]\nYou planted basil."));
        assert!(text.contains("[You are in the Bedroom.]\nMorning light."));
        assert!(text.ends_with("[You have 1 unread letter.]"));
    }

    #[test]
    fn first_wake_has_no_memory() {
        let text = wake_message(Wake {
            session_number: 1,
            room_name: "Bedroom",
            description: "",
            atmosphere: Some("It is quiet."),
            previous_summary: None,
            unread: Some(0),
        });
        assert_eq!(
            text,
            "[You wake up for the first time.]\n\n[You are in the Bedroom.]\nIt is quiet."
        );
    }

    #[test]
    fn location_lists_exits() {
        let rooms = RoomRegistry::new()
            .with_room(
                Room::new("bedroom", "Bedroom")
                    .with_description("Curtains drawn.")
                    .with_transitions(["hallway"]),
            )
            .with_room(Room::new("hallway", "Hallway"))
            .with_room(Room::new("garden", "Garden"));

        let section = location_section(&rooms, "bedroom");
        assert!(section.contains("You are in the Bedroom (bedroom).\nCurtains drawn."));
        assert!(section.ends_with("From here you can go to: hallway."));
    }
}
