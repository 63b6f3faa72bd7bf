use strum::{AsRefStr, Display, EnumString};

/// Declared media type of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AttachmentKind {
    Image,
    Video,
    File,
}

/// A row in the `dm_attachments` table. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AttachmentRecord {
    pub id: i64,
    pub message_id: i64,
    pub url: String,
    /// One of `image`, `video`, `file` (enforced by a CHECK constraint).
    pub kind: String,
    pub created_at: i64,
}

/// Attachment descriptor supplied when posting a message. The binary
/// content was already stored by the attachment store; only the URL is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub url: String,
    pub kind: AttachmentKind,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("IMAGE".parse::<AttachmentKind>().unwrap(), AttachmentKind::Image);
        assert_eq!("video".parse::<AttachmentKind>().unwrap(), AttachmentKind::Video);
        assert_eq!(AttachmentKind::File.as_ref(), "file");
        assert!("audio".parse::<AttachmentKind>().is_err());
    }
}
