use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::to_rfc3339;
use crate::entities::{AttachmentKind, AttachmentRecord, MessageView, NewAttachment};
use crate::error::DmError;
use crate::schemas::dm::member::MemberResponse;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    /// URL previously returned by `POST /upload`.
    pub file_url: String,
    /// `image`, `video` or `file`.
    pub file_type: String,
}

impl AttachmentInput {
    pub fn to_new_attachment(&self) -> Result<NewAttachment, DmError> {
        let kind = self
            .file_type
            .trim()
            .parse::<AttachmentKind>()
            .map_err(|_| {
                DmError::Validation(format!("unsupported attachment type: {}", self.file_type))
            })?;
        Ok(NewAttachment {
            url: self.file_url.trim().to_owned(),
            kind,
        })
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub sender_id: Option<i64>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub member_id: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub offset: Option<i64>,
    /// Page size; values outside `1..=200` fall back to 50.
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentResponse {
    pub id: i64,
    pub message_id: i64,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: i64,
    pub thread_id: i64,
    pub sender_id: i64,
    pub sender: MemberResponse,
    pub content: String,
    pub is_read: bool,
    pub edited_at: Option<String>,
    pub created_at: String,
    pub attachments: Vec<AttachmentResponse>,
}

impl AttachmentRecord {
    pub fn to_response(&self) -> AttachmentResponse {
        AttachmentResponse {
            id: self.id,
            message_id: self.message_id,
            url: self.url.clone(),
            kind: self.kind.clone(),
        }
    }
}

impl MessageView {
    pub fn to_response(&self) -> MessageResponse {
        MessageResponse {
            id: self.message.id,
            thread_id: self.message.thread_id,
            sender_id: self.message.sender_id,
            sender: self.sender.to_response(),
            content: self.message.content.clone(),
            is_read: self.message.is_read,
            edited_at: self.message.edited_at.map(to_rfc3339),
            created_at: to_rfc3339(self.message.created_at),
            attachments: self.attachments.iter().map(|a| a.to_response()).collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn attachment_type_is_checked() {
        let ok = AttachmentInput {
            file_url: " /uploads/1_a.mp4 ".into(),
            file_type: "Video".into(),
        };
        let parsed = ok.to_new_attachment().unwrap();
        assert_eq!(parsed.kind, AttachmentKind::Video);
        assert_eq!(parsed.url, "/uploads/1_a.mp4");

        let bad = AttachmentInput {
            file_url: "/uploads/x".into(),
            file_type: "audio".into(),
        };
        assert!(matches!(bad.to_new_attachment(), Err(DmError::Validation(_))));
    }

    #[test]
    fn long_messages_with_many_attachments_are_accepted() {
        let attachments: Vec<_> = (0..25)
            .map(|i| serde_json::json!({ "fileUrl": format!("/uploads/{i}.png"), "fileType": "image" }))
            .collect();
        let body = serde_json::json!({
            "content": "x".repeat(50_000),
            "attachments": attachments,
        });
        let req: PostMessageRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.content.len(), 50_000);

        let parsed = req
            .attachments
            .iter()
            .map(AttachmentInput::to_new_attachment)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(parsed.len(), 25);
    }
}
