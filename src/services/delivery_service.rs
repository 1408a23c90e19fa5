use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{ChatId, Media, Payload, VideoRef};
use crate::errors::{RelayError, RelayResult};
use crate::messaging::{MessagingPort, VideoUpload, CAPTION_LIMIT};
use crate::sources::VideoResolver;

/// How a payload ended up reaching the chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Native,
    Fallback,
}

pub struct DeliveryService {
    messenger: Arc<dyn MessagingPort>,
    videos: Arc<dyn VideoResolver>,
    video_max_bytes: u64,
}

impl DeliveryService {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        videos: Arc<dyn VideoResolver>,
        video_max_bytes: u64,
    ) -> Self {
        Self {
            messenger,
            videos,
            video_max_bytes,
        }
    }

    /// Deliver a payload natively, or as its permalink message if that fails.
    /// The fallback is attempted once; when it fails too the item is undelivered.
    pub async fn send(&self, payload: &Payload, chat_id: ChatId) -> RelayResult<Delivery> {
        let native_err = match self.send_native(payload, chat_id).await {
            Ok(()) => return Ok(Delivery::Native),
            Err(e) => e,
        };

        warn!(
            item_id = %payload.item_id,
            kind = %payload.kind,
            error = %native_err,
            "native delivery failed, sending permalink instead"
        );

        match self.messenger.send_text(chat_id, &payload.fallback).await {
            Ok(()) => Ok(Delivery::Fallback),
            Err(fallback_err) => Err(RelayError::DeliveryFailed(format!(
                "{}: {}; fallback: {}",
                payload.item_id, native_err, fallback_err
            ))),
        }
    }

    async fn send_native(&self, payload: &Payload, chat_id: ChatId) -> RelayResult<()> {
        let text = payload.text.as_str();

        match &payload.media {
            Media::None => self.messenger.send_text(chat_id, text).await,
            Media::Photo(url) => {
                let (caption, rest) = split_caption(text);
                self.messenger.send_photo(chat_id, url, caption).await?;
                self.send_rest(chat_id, rest).await
            }
            Media::Gallery(urls) => match urls.as_slice() {
                [] => self.messenger.send_text(chat_id, text).await,
                [url] => {
                    let (caption, rest) = split_caption(text);
                    self.messenger.send_photo(chat_id, url, caption).await?;
                    self.send_rest(chat_id, rest).await
                }
                _ => {
                    self.messenger.send_media_group(chat_id, urls.clone()).await?;
                    self.messenger.send_text(chat_id, text).await
                }
            },
            Media::Video(VideoRef::Hosted { item_id }) => {
                let bytes = self
                    .videos
                    .fetch_video(item_id, self.video_max_bytes)
                    .await?
                    .ok_or_else(|| {
                        RelayError::DeliveryFailed(format!(
                            "video for {} is unavailable or larger than {} bytes",
                            item_id, self.video_max_bytes
                        ))
                    })?;
                debug!(item_id = %item_id, bytes = bytes.len(), "uploading hosted video");

                let (caption, rest) = split_caption(text);
                self.messenger
                    .send_video(chat_id, VideoUpload::Bytes(bytes), caption)
                    .await?;
                self.send_rest(chat_id, rest).await
            }
            Media::Video(VideoRef::Direct(url)) => {
                let (caption, rest) = split_caption(text);
                self.messenger
                    .send_video(chat_id, VideoUpload::Url(url.clone()), caption)
                    .await?;
                self.send_rest(chat_id, rest).await
            }
            Media::Video(VideoRef::External(url)) | Media::Link(url) => {
                self.messenger.send_link_preview(chat_id, text, url).await
            }
        }
    }

    async fn send_rest(&self, chat_id: ChatId, rest: Option<&str>) -> RelayResult<()> {
        match rest {
            Some(text) => self.messenger.send_text(chat_id, text).await,
            None => Ok(()),
        }
    }
}

/// Use the text as a caption when it fits; otherwise the media goes out bare
/// and the text follows as its own message.
fn split_caption(text: &str) -> (Option<String>, Option<&str>) {
    if text.chars().count() <= CAPTION_LIMIT {
        (Some(text.to_string()), None)
    } else {
        (None, Some(text))
    }
}
