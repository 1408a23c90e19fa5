use async_trait::async_trait;
use chrono::DateTime;
use reddit::{Post, RedditClient, Sort, TimeFilter};
use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::domain::{Item, SortMode, Source};
use crate::errors::{RelayError, RelayResult};
use crate::sources::traits::{ContentProvider, VideoResolver};

pub struct RedditSource {
    client: RedditClient,
    http: Client,
}

impl RedditSource {
    pub fn new(config: &Config) -> RelayResult<Self> {
        let client = reddit::create_client(
            &config.reddit_client_id,
            &config.reddit_client_secret,
            &config.reddit_user_agent,
            config.http_timeout,
        )?;

        let http = Client::builder()
            .user_agent(config.reddit_user_agent.clone())
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self { client, http })
    }

    fn sort_for(mode: SortMode) -> Sort {
        match mode {
            SortMode::New => Sort::New,
            SortMode::Hot => Sort::Hot,
            SortMode::TopDaily => Sort::Top(TimeFilter::Day),
            SortMode::TopWeekly => Sort::Top(TimeFilter::Week),
            SortMode::TopMonthly => Sort::Top(TimeFilter::Month),
        }
    }

    /// Map a reddit post onto the relay's item model
    fn post_to_item(source: &Source, post: Post) -> Item {
        let created_time = DateTime::from_timestamp(post.created_utc as i64, 0).unwrap_or_default();
        let subreddit = if post.subreddit.is_empty() {
            source.name.clone()
        } else {
            post.subreddit.clone()
        };

        let gallery = if post.is_gallery() {
            post.gallery_urls()
        } else {
            Vec::new()
        };
        let video_url = post.video_fallback_url();
        let permalink = post.permalink_url();

        Item::new(post.id, subreddit, post.title, permalink, created_time)
            .with_body(post.selftext)
            .with_url(post.url)
            .with_gallery(gallery)
            .with_video(post.is_video, video_url)
            .self_post(post.is_self)
            .adult(post.over_18)
    }

    /// Download a file, giving up as soon as it grows past `max_bytes`
    async fn download(&self, url: &str, max_bytes: u64) -> RelayResult<Option<Vec<u8>>> {
        let mut response = self.http.get(url).send().await?.error_for_status()?;

        if response.content_length().is_some_and(|len| len > max_bytes) {
            debug!(url, max_bytes, "video larger than the upload ceiling");
            return Ok(None);
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (bytes.len() + chunk.len()) as u64 > max_bytes {
                debug!(url, max_bytes, "video stream passed the upload ceiling");
                return Ok(None);
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(Some(bytes))
    }
}

#[async_trait]
impl ContentProvider for RedditSource {
    async fn list_new(&self, source: &Source, limit: u32) -> RelayResult<Vec<Item>> {
        let posts = self
            .client
            .listing(&source.name, Self::sort_for(source.sort_mode), limit)
            .await?;

        Ok(posts
            .into_iter()
            .map(|post| Self::post_to_item(source, post))
            .collect())
    }

    async fn verify(&self, name: &str) -> RelayResult<()> {
        let about = self.client.about(name).await?;
        debug!(name, title = %about.title, "verified subreddit");
        Ok(())
    }
}

#[async_trait]
impl VideoResolver for RedditSource {
    async fn fetch_video(&self, item_id: &str, max_bytes: u64) -> RelayResult<Option<Vec<u8>>> {
        // Fallback URLs are signed and expire, so look the post up again
        let post = match self.client.post(item_id).await {
            Ok(Some(post)) => post,
            Ok(None) => return Ok(None),
            Err(e) => return Err(RelayError::ProviderUnavailable(e.to_string())),
        };

        match post.video_fallback_url() {
            Some(url) => self.download(&url, max_bytes).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemKind;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn source() -> Source {
        Source::new("python".to_string(), SortMode::New)
    }

    fn post(value: serde_json::Value) -> Post {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_sort_mapping() {
        assert_eq!(RedditSource::sort_for(SortMode::New), Sort::New);
        assert_eq!(RedditSource::sort_for(SortMode::Hot), Sort::Hot);
        assert_eq!(
            RedditSource::sort_for(SortMode::TopWeekly),
            Sort::Top(TimeFilter::Week)
        );
    }

    #[test]
    fn test_self_post_maps_to_text_item() {
        let item = RedditSource::post_to_item(
            &source(),
            post(json!({
                "id": "t2",
                "title": "Ask: lifetimes?",
                "selftext": "How do they work",
                "url": "https://www.reddit.com/r/Python/comments/t2/ask/",
                "permalink": "/r/Python/comments/t2/ask/",
                "created_utc": 1728000060.0,
                "is_self": true,
                "over_18": false,
                "subreddit": "Python"
            })),
        );

        assert_eq!(item.id, "t2");
        assert_eq!(item.source, "Python");
        assert_eq!(item.body, "How do they work");
        assert_eq!(item.permalink, "https://reddit.com/r/Python/comments/t2/ask/");
        assert_eq!(item.created_time.timestamp(), 1728000060);
        assert_eq!(item.kind(), ItemKind::Text);
    }

    #[test]
    fn test_video_post_keeps_fallback_url() {
        let item = RedditSource::post_to_item(
            &source(),
            post(json!({
                "id": "v1",
                "title": "Clip",
                "url": "https://v.redd.it/abc",
                "permalink": "/r/python/comments/v1/clip/",
                "created_utc": 1728000100,
                "is_video": true,
                "over_18": true,
                "media": {"reddit_video": {"fallback_url": "https://v.redd.it/abc/DASH_480.mp4"}}
            })),
        );

        assert_eq!(item.source, "python");
        assert!(item.is_adult);
        assert!(item.is_hosted_video());
        assert_eq!(item.video_url.as_deref(), Some("https://v.redd.it/abc/DASH_480.mp4"));
        assert_eq!(item.kind(), ItemKind::Video);
    }

    #[test]
    fn test_gallery_post_maps_images() {
        let item = RedditSource::post_to_item(
            &source(),
            post(json!({
                "id": "g1",
                "title": "Setup",
                "url": "https://www.reddit.com/gallery/g1",
                "permalink": "/r/python/comments/g1/setup/",
                "created_utc": 1728000200,
                "is_gallery": true,
                "gallery_data": {"items": [{"media_id": "a"}, {"media_id": "b"}]},
                "media_metadata": {
                    "a": {"e": "Image", "s": {"u": "https://preview.redd.it/a.jpg"}},
                    "b": {"e": "Image", "s": {"u": "https://preview.redd.it/b.png"}}
                }
            })),
        );

        assert_eq!(item.kind(), ItemKind::Gallery);
        assert_eq!(
            item.gallery,
            vec!["https://preview.redd.it/a.jpg", "https://preview.redd.it/b.png"]
        );
    }

    /// Serve one file over a single connection, with or without a Content-Length header
    async fn serve_file(body: Vec<u8>, with_length: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/DASH_480.mp4", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = [0u8; 2048];
            let _ = stream.read(&mut head).await;

            let length = if with_length {
                format!("Content-Length: {}\r\n", body.len())
            } else {
                String::new()
            };
            let reply = format!("HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\n{length}Connection: close\r\n\r\n");
            let _ = stream.write_all(reply.as_bytes()).await;
            let _ = stream.write_all(&body).await;
            let _ = stream.shutdown().await;
        });

        url
    }

    fn local_source() -> RedditSource {
        RedditSource {
            client: reddit::create_client("id", "secret", "subrelay-test", Duration::from_secs(5))
                .unwrap(),
            http: Client::new(),
        }
    }

    #[tokio::test]
    async fn test_download_refuses_declared_oversize() {
        let url = serve_file(vec![7; 100], true).await;
        let bytes = local_source().download(&url, 50).await.unwrap();
        assert_eq!(bytes, None);
    }

    #[tokio::test]
    async fn test_download_stops_when_stream_passes_ceiling() {
        let url = serve_file(vec![7; 100], false).await;
        let bytes = local_source().download(&url, 50).await.unwrap();
        assert_eq!(bytes, None);
    }

    #[tokio::test]
    async fn test_download_accepts_file_exactly_at_ceiling() {
        let url = serve_file(vec![7; 50], true).await;
        let bytes = local_source().download(&url, 50).await.unwrap();
        assert_eq!(bytes, Some(vec![7; 50]));

        let url = serve_file(vec![9; 50], false).await;
        let bytes = local_source().download(&url, 50).await.unwrap();
        assert_eq!(bytes, Some(vec![9; 50]));
    }
}
