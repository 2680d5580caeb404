//! Rate-limited user notifications.

mod delivery;
mod message;
mod request;
mod service;

pub use delivery::{LogNotifier, Notifier};
pub use message::{color_for, render_html, Notification, DEFAULT_SUBJECT};
pub use request::NotifyRequest;
pub use service::UserNotifier;
