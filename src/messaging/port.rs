use async_trait::async_trait;

use crate::domain::ChatId;
use crate::errors::RelayResult;

/// Longest text message Telegram accepts, in characters
pub const MESSAGE_LIMIT: usize = 4096;

/// Longest media caption Telegram accepts, in characters
pub const CAPTION_LIMIT: usize = 1024;

/// Video content handed to the messaging platform
#[derive(Debug, Clone, PartialEq)]
pub enum VideoUpload {
    /// Let the platform fetch the file itself
    Url(String),
    /// Upload a file already downloaded
    Bytes(Vec<u8>),
}

/// Outbound side of the messaging platform.
///
/// All text is Telegram-flavoured HTML.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Plain message with web previews disabled
    async fn send_text(&self, chat_id: ChatId, html: &str) -> RelayResult<()>;

    async fn send_photo(&self, chat_id: ChatId, url: &str, caption: Option<String>) -> RelayResult<()>;

    async fn send_video(
        &self,
        chat_id: ChatId,
        video: VideoUpload,
        caption: Option<String>,
    ) -> RelayResult<()>;

    /// Album of photos, at most ten per call
    async fn send_media_group(&self, chat_id: ChatId, urls: Vec<String>) -> RelayResult<()>;

    /// Message whose web preview shows `url` rather than the first link in the text
    async fn send_link_preview(&self, chat_id: ChatId, html: &str, url: &str) -> RelayResult<()>;
}
