use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{InputFile, InputMedia, InputMediaPhoto, ParseMode},
};
use tokio::time::sleep;
use url::Url;

use crate::domain::payload::escape_html;
use crate::domain::ChatId;
use crate::errors::{RelayError, RelayResult};
use crate::messaging::port::{MessagingPort, VideoUpload};

const ALBUM_LIMIT: usize = 10;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn parse_url(url: &str) -> RelayResult<Url> {
        Url::parse(url).map_err(|e| RelayError::InvalidInput(format!("bad media url {url}: {e}")))
    }

    fn map_err(e: teloxide::RequestError) -> RelayError {
        RelayError::Messaging(format!("telegram error: {e}"))
    }

    /// Retry once when Telegram asks us to slow down
    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> RelayResult<T>
    where
        Fut: std::future::IntoFuture<Output = Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(teloxide::RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    tracing::debug!(wait = ?d, "telegram rate limit, retrying");
                    sleep(d).await;
                }
                Err(other) => return Err(Self::map_err(other)),
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, html: &str) -> RelayResult<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), html.to_string())
                .parse_mode(ParseMode::Html)
                .disable_web_page_preview(true)
        })
        .await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, url: &str, caption: Option<String>) -> RelayResult<()> {
        let photo = InputFile::url(Self::parse_url(url)?);
        self.with_retry(|| {
            let request = self.bot.send_photo(Self::tg_chat(chat_id), photo.clone());
            match &caption {
                Some(text) => request.caption(text.clone()).parse_mode(ParseMode::Html),
                None => request,
            }
        })
        .await?;
        Ok(())
    }

    async fn send_video(
        &self,
        chat_id: ChatId,
        video: VideoUpload,
        caption: Option<String>,
    ) -> RelayResult<()> {
        let file = match video {
            VideoUpload::Url(url) => InputFile::url(Self::parse_url(&url)?),
            VideoUpload::Bytes(bytes) => InputFile::memory(bytes).file_name("video.mp4"),
        };
        self.with_retry(|| {
            let request = self
                .bot
                .send_video(Self::tg_chat(chat_id), file.clone())
                .supports_streaming(true);
            match &caption {
                Some(text) => request.caption(text.clone()).parse_mode(ParseMode::Html),
                None => request,
            }
        })
        .await?;
        Ok(())
    }

    async fn send_media_group(&self, chat_id: ChatId, urls: Vec<String>) -> RelayResult<()> {
        let media = urls
            .iter()
            .take(ALBUM_LIMIT)
            .map(|url| {
                Self::parse_url(url)
                    .map(|u| InputMedia::Photo(InputMediaPhoto::new(InputFile::url(u))))
            })
            .collect::<RelayResult<Vec<_>>>()?;

        self.with_retry(|| self.bot.send_media_group(Self::tg_chat(chat_id), media.clone()))
            .await?;
        Ok(())
    }

    async fn send_link_preview(&self, chat_id: ChatId, html: &str, url: &str) -> RelayResult<()> {
        // Telegram previews the first link, so lead with an invisible one
        let text = format!("<a href=\"{}\">\u{200b}</a>{html}", escape_html(url));
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), text.clone())
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }
}
