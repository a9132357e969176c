use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::Deserialize;
use tracing::debug;

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1";

/// Most messages pulled in one sync cycle.
pub const MAX_BATCH: usize = 10;

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// A Gmail message in `format=full`, reduced to the parts this binary
/// reads. Unknown fields on the wire are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub payload: Option<Payload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub filename: String,
    pub body: Option<PartBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct AttachmentBody {
    data: String,
}

pub struct GmailClient {
    http: reqwest::Client,
    token: String,
}

impl GmailClient {
    /// Build a client from the pre-acquired OAuth token in the environment.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GOOGLE_ACCESS_TOKEN")
            .map_err(|_| anyhow!("GOOGLE_ACCESS_TOKEN environment variable is not set"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            token,
        })
    }

    /// List message ids matching a Gmail search query, newest first.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        debug!("Gmail search: {}", query);
        let max_results = max_results.to_string();
        let list: MessageList = self
            .http
            .get(format!("{GMAIL_API}/users/me/messages"))
            .bearer_auth(&self.token)
            .query(&[("q", query), ("maxResults", max_results.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to list Gmail messages")?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    /// Fetch one message with its headers and body-part structure.
    pub async fn message(&self, id: &str) -> Result<Message> {
        self.http
            .get(format!("{GMAIL_API}/users/me/messages/{id}"))
            .bearer_auth(&self.token)
            .query(&[("format", "full")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Failed to fetch Gmail message {id}"))
    }

    /// Download one attachment and decode its base64url payload.
    pub async fn attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let body: AttachmentBody = self
            .http
            .get(format!(
                "{GMAIL_API}/users/me/messages/{message_id}/attachments/{attachment_id}"
            ))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Failed to fetch attachment for message {message_id}"))?;
        decode_attachment_data(&body.data)
    }
}

fn decode_attachment_data(data: &str) -> Result<Vec<u8>> {
    URL_SAFE
        .decode(data.as_bytes())
        .context("Attachment payload is not valid base64url")
}
