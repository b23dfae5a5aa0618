//! WATI channel: WhatsApp session messages and files over the WATI REST API.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::channels::Messenger;
use crate::error::DeliveryError;

/// WATI API client.
pub struct WatiClient {
    api_url: String,
    access_token: SecretString,
    client: reqwest::Client,
}

impl WatiClient {
    /// `client` should carry a request timeout; WATI calls are never retried.
    pub fn new(api_url: impl Into<String>, access_token: SecretString, client: reqwest::Client) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token,
            client,
        }
    }

    fn api_url(&self, method: &str, phone_number: &str) -> String {
        format!("{}/api/v1/{method}/{phone_number}", self.api_url)
    }

    /// Upload a file as a session file with a caption.
    async fn send_session_file(
        &self,
        kind: &'static str,
        phone_number: &str,
        path: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| DeliveryError::Attachment {
                path: path.to_path_buf(),
                source,
            })?;

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime_for(path))
            .map_err(|e| send_failed(kind, phone_number, e))?;
        let form = Form::new().part("file", part);

        let resp = self
            .client
            .post(self.api_url("sendSessionFile", phone_number))
            .header(reqwest::header::AUTHORIZATION, self.access_token.expose_secret())
            .query(&[("caption", caption)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| send_failed(kind, phone_number, e))?;

        check_response(kind, phone_number, resp).await?;
        info!(phone_number, file = %file_name, "WATI {kind} sent");
        Ok(())
    }
}

#[async_trait]
impl Messenger for WatiClient {
    async fn send_text(&self, phone_number: &str, text: &str) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(self.api_url("sendSessionMessage", phone_number))
            .header(reqwest::header::AUTHORIZATION, self.access_token.expose_secret())
            .query(&[("messageText", text)])
            .send()
            .await
            .map_err(|e| send_failed("message", phone_number, e))?;

        check_response("message", phone_number, resp).await?;
        debug!(phone_number, "WATI message sent");
        Ok(())
    }

    async fn send_image(
        &self,
        phone_number: &str,
        image: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        self.send_session_file("image", phone_number, image, caption)
            .await
    }

    async fn send_file(
        &self,
        phone_number: &str,
        file: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        self.send_session_file("file", phone_number, file, caption)
            .await
    }
}

fn send_failed(
    kind: &'static str,
    phone_number: &str,
    e: impl std::fmt::Display,
) -> DeliveryError {
    DeliveryError::SendFailed {
        kind,
        phone_number: phone_number.to_string(),
        reason: e.to_string(),
    }
}

/// Non-2xx, or a 2xx JSON body with `"result": false`, is a failed delivery.
async fn check_response(
    kind: &'static str,
    phone_number: &str,
    resp: reqwest::Response,
) -> Result<(), DeliveryError> {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(send_failed(
            kind,
            phone_number,
            format!("HTTP {status}: {body}"),
        ));
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body)
        && json.get("result").and_then(|r| r.as_bool()) == Some(false)
    {
        let reason = json
            .get("info")
            .and_then(|i| i.as_str())
            .unwrap_or("result=false")
            .to_string();
        return Err(DeliveryError::Rejected {
            kind,
            phone_number: phone_number.to_string(),
            reason,
        });
    }

    Ok(())
}

/// MIME type from the file extension.
fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
