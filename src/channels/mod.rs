//! Outbound messaging channels.

pub mod messenger;
pub mod wati;

pub use messenger::Messenger;
pub use wati::WatiClient;
