use async_trait::async_trait;

use crate::domain::ChatId;
use crate::errors::RelayResult;
use crate::messaging::port::{MessagingPort, VideoUpload};

/// Prints what would be sent instead of talking to Telegram.
/// Used by `run --dry-run`.
#[derive(Debug, Default, Clone)]
pub struct ConsoleMessenger;

impl ConsoleMessenger {
    pub fn new() -> Self {
        Self
    }

    fn print(chat_id: ChatId, what: &str, body: &str) {
        println!("[DRY RUN] chat {} <{}>", chat_id.0, what);
        if !body.is_empty() {
            println!("{}", body);
        }
        println!();
    }
}

#[async_trait]
impl MessagingPort for ConsoleMessenger {
    async fn send_text(&self, chat_id: ChatId, html: &str) -> RelayResult<()> {
        Self::print(chat_id, "text", html);
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, url: &str, caption: Option<String>) -> RelayResult<()> {
        Self::print(chat_id, &format!("photo {url}"), caption.as_deref().unwrap_or_default());
        Ok(())
    }

    async fn send_video(
        &self,
        chat_id: ChatId,
        video: VideoUpload,
        caption: Option<String>,
    ) -> RelayResult<()> {
        let what = match &video {
            VideoUpload::Url(url) => format!("video {url}"),
            VideoUpload::Bytes(bytes) => format!("video upload, {} bytes", bytes.len()),
        };
        Self::print(chat_id, &what, caption.as_deref().unwrap_or_default());
        Ok(())
    }

    async fn send_media_group(&self, chat_id: ChatId, urls: Vec<String>) -> RelayResult<()> {
        Self::print(chat_id, &format!("album of {}", urls.len()), &urls.join("\n"));
        Ok(())
    }

    async fn send_link_preview(&self, chat_id: ChatId, html: &str, url: &str) -> RelayResult<()> {
        Self::print(chat_id, &format!("link preview {url}"), html);
        Ok(())
    }
}
