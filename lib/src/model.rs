use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thing<T> {
    pub kind: String,
    pub data: T,
}

/// Subreddit metadata returned by `/r/{name}/about`
#[derive(Debug, Clone, Deserialize)]
pub struct Subreddit {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub over18: Option<bool>,
    #[serde(default)]
    pub subscribers: Option<u64>,
}

/// A link or self post (`t3` thing)
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub url: Option<String>,
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub is_gallery: Option<bool>,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(default)]
    pub secure_media: Option<Media>,
    #[serde(default)]
    pub gallery_data: Option<GalleryData>,
    #[serde(default)]
    pub media_metadata: Option<HashMap<String, MediaMetadata>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditVideo {
    pub fallback_url: String,
    #[serde(default)]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryData {
    #[serde(default)]
    pub items: Vec<GalleryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryItem {
    pub media_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaMetadata {
    #[serde(default)]
    pub status: Option<String>,
    /// Element kind, "Image" or "AnimatedImage"
    #[serde(default)]
    pub e: Option<String>,
    #[serde(default)]
    pub s: Option<MediaSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSource {
    #[serde(default)]
    pub u: Option<String>,
    #[serde(default)]
    pub gif: Option<String>,
}

impl Post {
    /// Full URL of the post on reddit.com
    pub fn permalink_url(&self) -> String {
        format!("https://reddit.com{}", self.permalink)
    }

    pub fn is_gallery(&self) -> bool {
        self.is_gallery.unwrap_or(false) && self.gallery_data.is_some()
    }

    /// Still-image URLs of a gallery post, in gallery order
    pub fn gallery_urls(&self) -> Vec<String> {
        let (Some(gallery), Some(metadata)) = (&self.gallery_data, &self.media_metadata) else {
            return Vec::new();
        };

        gallery
            .items
            .iter()
            .filter_map(|item| metadata.get(&item.media_id))
            .filter(|meta| meta.e.as_deref() == Some("Image"))
            .filter_map(|meta| meta.s.as_ref().and_then(|s| s.u.as_deref()))
            .map(|u| u.replace("&amp;", "&"))
            .collect()
    }

    /// Direct MP4 URL of a reddit-hosted video, if the listing carried one
    pub fn video_fallback_url(&self) -> Option<String> {
        self.secure_media
            .as_ref()
            .and_then(|m| m.reddit_video.as_ref())
            .or_else(|| self.media.as_ref().and_then(|m| m.reddit_video.as_ref()))
            .map(|v| v.fallback_url.replace("&amp;", "&"))
    }
}
