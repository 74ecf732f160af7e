//! Wire framing and authorization rules for the text protocol.
//!
//! Backlog replay lines are prefixed `[Recent] `, live broadcasts
//! `[Notification] `, so clients can tell them apart. Inbound frames are
//! raw text; they become notifications when the connection holds the
//! sender role or the text carries the reserved `admin:` marker.

use crate::websocket::Role;

/// Prefix for backlog entries replayed to a newly joined connection.
pub const RECENT_PREFIX: &str = "[Recent] ";

/// Prefix for live broadcast lines.
pub const NOTIFICATION_PREFIX: &str = "[Notification] ";

/// Reserved marker that lets any connection submit a notification.
pub const ADMIN_PREFIX: &str = "admin:";

/// Fixed reply sent to a connection whose message was not authorized.
pub const REJECTION_TEXT: &str = "You are not authorized to send notifications.";

/// A frame may be broadcast when the connection declared the sender role
/// or the text starts with the reserved marker.
pub fn is_authorized(role: Role, text: &str) -> bool {
    role == Role::Sender || text.starts_with(ADMIN_PREFIX)
}

/// Extract the notification body: drop the reserved marker if present and
/// trim surrounding whitespace.
pub fn notification_body(text: &str) -> String {
    text.strip_prefix(ADMIN_PREFIX).unwrap_or(text).trim().to_string()
}

pub fn recent_frame(message: &str) -> String {
    format!("{RECENT_PREFIX}{message}")
}

pub fn notification_frame(message: &str) -> String {
    format!("{NOTIFICATION_PREFIX}{message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_is_authorized_without_marker() {
        assert!(is_authorized(Role::Sender, "hello"));
    }

    #[test]
    fn receiver_needs_the_marker() {
        assert!(!is_authorized(Role::Receiver, "hello"));
        assert!(is_authorized(Role::Receiver, "admin:hello"));
    }

    #[test]
    fn body_strips_marker_and_trims() {
        assert_eq!(notification_body("admin: launch "), "launch");
        assert_eq!(notification_body("  plain  "), "plain");
        assert_eq!(notification_body("admin:"), "");
    }

    #[test]
    fn marker_is_only_stripped_at_the_front() {
        assert_eq!(notification_body("note admin:x"), "note admin:x");
    }

    #[test]
    fn frames_carry_their_prefixes() {
        assert_eq!(recent_frame("a"), "[Recent] a");
        assert_eq!(notification_frame("launch"), "[Notification] launch");
    }
}
