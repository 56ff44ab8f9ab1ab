use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;
use validator::{validate_url, Validate, ValidationError};

pub const PREVIEW_GRAPHEMES: usize = 200;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub attachments: Vec<String>,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Message is too long"))]
    pub content: String,
    #[serde(default)]
    #[validate(
        length(max = 10, message = "At most 10 attachments are allowed"),
        custom = "attachment_urls"
    )]
    pub attachments: Vec<String>,
}

#[allow(clippy::ptr_arg)]
fn attachment_urls(attachments: &Vec<String>) -> Result<(), ValidationError> {
    if attachments.iter().any(|url| !validate_url(url.as_str())) {
        let mut error = ValidationError::new("url");
        error.message = Some("Attachments must be valid URLs".into());
        return Err(error);
    }
    Ok(())
}

impl SendMessageRequest {
    pub fn trimmed_content(&self) -> Result<String, String> {
        let content = self.content.trim();
        let attachments = self.attachments.iter().any(|a| !a.trim().is_empty());
        if content.is_empty() && !attachments {
            return Err("Message content or attachments are required".into());
        }
        Ok(content.to_string())
    }
}

text_enum! {
    pub enum SortOrder {
        Asc => "asc",
        Desc => "desc",
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    /// Without it, every message the caller sent or received.
    pub with_user: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sort: Option<SortOrder>,
}

#[derive(Debug, Serialize)]
pub struct ConversationPage {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MarkReadRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 message ids are accepted"))]
    pub message_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

#[derive(Debug, Deserialize)]
pub struct TypingRequest {
    pub recipient_id: Uuid,
    #[serde(default = "default_typing")]
    pub is_typing: bool,
}

fn default_typing() -> bool {
    true
}

/// First `PREVIEW_GRAPHEMES` user-perceived characters, with an ellipsis when cut.
pub fn preview(content: &str) -> String {
    let mut graphemes = content.graphemes(true);
    let head: String = graphemes.by_ref().take(PREVIEW_GRAPHEMES).collect();
    if graphemes.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
