//! Outbound delivery trait.

use std::path::Path;

use async_trait::async_trait;

use crate::error::DeliveryError;

/// Best-effort outbound messaging, addressed by phone number.
///
/// No retries: a failed send is returned to the caller, which logs it and moves on.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, phone_number: &str, text: &str) -> Result<(), DeliveryError>;

    /// Send an image file with a caption.
    async fn send_image(
        &self,
        phone_number: &str,
        image: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError>;

    /// Send a document (e.g. the daily report) with a caption.
    async fn send_file(
        &self,
        phone_number: &str,
        file: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError>;
}
