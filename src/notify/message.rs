//! Notification messages and their HTML rendering.

use crate::ratelimit::policy::{MARKETING, NEWS, STATUS};

/// Subject line used for every notification.
pub const DEFAULT_SUBJECT: &str = "Notification";

/// A message ready to be handed to a [`Notifier`](super::Notifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub body: String,
}

impl Notification {
    /// Build the notification sent to `to` for `message_type`.
    pub fn for_message_type(to: &str, message_type: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            body: render_html(message_type),
        }
    }
}

/// Text colour used for a message type.
pub fn color_for(message_type: &str) -> &'static str {
    match message_type {
        NEWS => "green",
        STATUS => "red",
        MARKETING => "yellow",
        _ => "black",
    }
}

/// Render the HTML page announcing `message_type`.
pub fn render_html(message_type: &str) -> String {
    format!(
        r#"
<!DOCTYPE html>
<html>
<head>
    <style>
        .centered {{
            text-align: center;
            color: {color};
            font-size: 48px;
        }}
    </style>
</head>
<body>
    <div class="centered">{message_type}</div>
</body>
</html>
"#,
        color = color_for(message_type),
        message_type = message_type,
    )
}
