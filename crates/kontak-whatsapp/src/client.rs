// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WhatsApp Cloud API (Meta Graph).
//!
//! Implements [`ChannelGateway`] over the `/{phone_number_id}/messages`
//! endpoint plus media upload and read receipts.

use std::time::Duration;

use async_trait::async_trait;
use kontak_config::model::WhatsappConfig;
use kontak_core::types::{
    ChannelKind, DocumentSource, OutboundContent, ProviderReceipt,
};
use kontak_core::{ChannelGateway, KontakError};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use tracing::debug;

/// Base URL of the Meta Graph API.
const GRAPH_BASE_URL: &str = "https://graph.facebook.com";

/// WhatsApp Cloud API client implementing [`ChannelGateway`].
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: reqwest::Client,
    base_url: String,
    phone_number_id: String,
}

impl WhatsAppClient {
    /// Creates a new client. Requires `access_token` and `phone_number_id`
    /// in the config.
    pub fn new(config: &WhatsappConfig) -> Result<Self, KontakError> {
        let access_token = config.access_token.as_deref().ok_or_else(|| {
            KontakError::Config("whatsapp.access_token is required for sending".into())
        })?;
        let phone_number_id = config.phone_number_id.as_deref().ok_or_else(|| {
            KontakError::Config("whatsapp.phone_number_id is required for sending".into())
        })?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| KontakError::Config(format!("invalid access token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| KontakError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: format!("{GRAPH_BASE_URL}/{}", config.api_version),
            phone_number_id: phone_number_id.to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.base_url, self.phone_number_id)
    }

    /// Build the provider payload for an outbound send.
    fn send_payload(&self, to: &str, content: &OutboundContent) -> serde_json::Value {
        let mut payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
        });
        match content {
            OutboundContent::Text { body } => {
                payload["type"] = json!("text");
                payload["text"] = json!({"preview_url": false, "body": body});
            }
            OutboundContent::Template {
                name,
                language,
                components,
            } => {
                payload["type"] = json!("template");
                let mut template = json!({"name": name, "language": {"code": language}});
                if let Some(components) = components {
                    template["components"] = components.clone();
                }
                payload["template"] = template;
            }
            OutboundContent::Media {
                media,
                url,
                caption,
            } => {
                let kind = media.to_string();
                let mut body = json!({"link": url});
                // The API accepts captions on image, video, and document only.
                if let Some(caption) = caption
                    && kind != "audio"
                {
                    body["caption"] = json!(caption);
                }
                payload["type"] = json!(kind.clone());
                payload[kind] = body;
            }
            OutboundContent::Document {
                source,
                filename,
                caption,
            } => {
                let mut document = json!({"filename": filename});
                match source {
                    DocumentSource::Link(url) => document["link"] = json!(url),
                    DocumentSource::Uploaded(id) => document["id"] = json!(id),
                }
                if let Some(caption) = caption {
                    document["caption"] = json!(caption);
                }
                payload["type"] = json!("document");
                payload["document"] = document;
            }
        }
        payload
    }

    async fn post_messages(
        &self,
        payload: serde_json::Value,
    ) -> Result<crate::wire::SendResponse, KontakError> {
        let response = self
            .client
            .post(self.messages_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| KontakError::Channel {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KontakError::channel(format!(
                "WhatsApp API returned {status}: {body}"
            )));
        }

        response.json().await.map_err(|e| KontakError::Channel {
            message: format!("malformed WhatsApp API response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Upload media bytes; returns the provider media id usable in a
    /// [`DocumentSource::Uploaded`] send.
    pub async fn upload_media(
        &self,
        data: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<String, KontakError> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| KontakError::Validation(format!("invalid mime type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", mime_type.to_string())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/{}/media", self.base_url, self.phone_number_id))
            .multipart(form)
            .send()
            .await
            .map_err(|e| KontakError::Channel {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KontakError::channel(format!(
                "media upload returned {status}: {body}"
            )));
        }

        let uploaded: crate::wire::MediaUploadResponse =
            response.json().await.map_err(|e| KontakError::Channel {
                message: format!("malformed media upload response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(uploaded.id)
    }

    /// React to a message with a single emoji. An empty emoji clears a
    /// previously sent reaction.
    pub async fn send_reaction(
        &self,
        to: &str,
        external_id: &str,
        emoji: &str,
    ) -> Result<(), KontakError> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "reaction",
            "reaction": {"message_id": external_id, "emoji": emoji},
        });
        self.post_messages(payload).await?;
        Ok(())
    }

    /// Fetch media bytes from a download URL resolved via
    /// [`Self::get_media_url`]. The URL only answers requests carrying the
    /// account's bearer token, so the shared authenticated client is used.
    pub async fn download_media(&self, url: &str) -> Result<Vec<u8>, KontakError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| KontakError::Channel {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(KontakError::channel(format!(
                "media download returned {status}"
            )));
        }

        let bytes = response.bytes().await.map_err(|e| KontakError::Channel {
            message: format!("media download failed mid-body: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(bytes.to_vec())
    }

    /// Resolve the short-lived download URL for an inbound media id.
    pub async fn get_media_url(&self, media_id: &str) -> Result<Option<String>, KontakError> {
        let response = self
            .client
            .get(format!("{}/{media_id}", self.base_url))
            .send()
            .await
            .map_err(|e| KontakError::Channel {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KontakError::channel(format!(
                "media lookup returned {status}: {body}"
            )));
        }

        let media: crate::wire::MediaUrlResponse =
            response.json().await.map_err(|e| KontakError::Channel {
                message: format!("malformed media lookup response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(media.url)
    }
}

#[async_trait]
impl ChannelGateway for WhatsAppClient {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Whatsapp
    }

    async fn send(
        &self,
        to: &str,
        content: &OutboundContent,
    ) -> Result<ProviderReceipt, KontakError> {
        let payload = self.send_payload(to, content);
        debug!(to, kind = %content.message_type(), "sending WhatsApp message");

        let response = self.post_messages(payload).await?;
        let external_id = response
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| {
                KontakError::channel("WhatsApp API response carried no message id")
            })?;
        Ok(ProviderReceipt { external_id })
    }

    async fn mark_read(&self, external_id: &str) -> Result<(), KontakError> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": external_id,
        });
        self.post_messages(payload).await?;
        Ok(())
    }
}
