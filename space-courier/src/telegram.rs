//! # Telegram publisher
//!
//! Implements the core [`Publisher`] trait against the Telegram Bot API.
//! Every send is one multipart POST; files are read fully into memory
//! (they are already capped by the downloader's size ceiling).
//!
//! - Construct with [`TelegramClient::new`] from loaded config.
//! - Errors from the API (non-2xx, or `"ok": false`) surface as
//!   [`Error::Delivery`] with Telegram's `description`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use space_courier_core::contract::Publisher;
use space_courier_core::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramClient {
    client: Client,
    api_url: String,
    bot_token: String,
}

impl TelegramClient {
    pub fn new(client: Client, api_url: &str, bot_token: &str) -> Self {
        tracing::info!(
            api_url = %api_url,
            token_set = !bot_token.is_empty(),
            "Initialized TelegramClient"
        );
        TelegramClient {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
    }

    async fn post(&self, method: &str, form: Form) -> Result<()> {
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        let parsed = serde_json::from_str::<ApiResponse>(&text).ok();

        match parsed {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => {
                tracing::debug!(method, "Telegram accepted request");
                Ok(())
            }
            Some(ApiResponse { description, .. }) => {
                let description = description.unwrap_or_else(|| status.to_string());
                tracing::error!(method, status = %status, %description, "Telegram rejected request");
                Err(Error::Delivery(format!("{method}: {description}")))
            }
            None => {
                tracing::error!(method, status = %status, body = %text, "Telegram returned non-JSON response");
                Err(Error::Delivery(format!("{method}: HTTP {status}")))
            }
        }
    }
}

async fn file_part(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(Part::bytes(bytes).file_name(name))
}

const PHOTO_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

fn is_photo(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PHOTO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Photo albums reject gifs and other formats, and documents only group with
/// documents, so one non-photo turns the whole group into documents.
fn group_media_type(paths: &[PathBuf]) -> &'static str {
    if paths.iter().all(|p| is_photo(p)) {
        "photo"
    } else {
        "document"
    }
}

#[async_trait]
impl Publisher for TelegramClient {
    async fn send_photo(&self, chat_id: &str, path: &Path) -> Result<()> {
        tracing::info!(chat_id, file = %path.display(), "Sending photo");
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", file_part(path).await?);
        self.post("sendPhoto", form).await
    }

    async fn send_document(&self, chat_id: &str, path: &Path) -> Result<()> {
        tracing::info!(chat_id, file = %path.display(), "Sending document");
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", file_part(path).await?);
        self.post("sendDocument", form).await
    }

    async fn send_media_group(&self, chat_id: &str, paths: &[PathBuf]) -> Result<()> {
        let media_type = group_media_type(paths);
        tracing::info!(chat_id, count = paths.len(), media_type, "Sending media group");
        let media: Vec<serde_json::Value> = (0..paths.len())
            .map(|i| serde_json::json!({"type": media_type, "media": format!("attach://file{i}")}))
            .collect();

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("media", serde_json::Value::Array(media).to_string());
        for (i, path) in paths.iter().enumerate() {
            form = form.part(format!("file{i}"), file_part(path).await?);
        }
        self.post("sendMediaGroup", form).await
    }
}
