use chrono::{DateTime, Utc};
use url::Url;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];
const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mov", ".gifv"];
const GIFV: &str = ".gifv";
const VIDEO_HOSTS: &[&str] = &["v.redd.it", "youtube.com", "youtu.be", "streamable.com", "vimeo.com"];

/// Host whose videos must be resolved and uploaded rather than linked
pub const HOSTED_VIDEO_DOMAIN: &str = "v.redd.it";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Text,
    Image,
    Video,
    Gallery,
    Link,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Text => "text",
            ItemKind::Image => "image",
            ItemKind::Video => "video",
            ItemKind::Gallery => "gallery",
            ItemKind::Link => "link",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Item {
    pub id: String,
    pub source: String,
    pub title: String,
    pub body: String,
    pub is_adult: bool,
    pub is_self: bool,
    pub is_video: bool,
    pub url: Option<String>,
    pub gallery: Vec<String>,
    pub video_url: Option<String>,
    pub permalink: String,
    pub created_time: DateTime<Utc>,
}

impl Item {
    pub fn new(
        id: String,
        source: String,
        title: String,
        permalink: String,
        created_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            source,
            title,
            body: String::new(),
            is_adult: false,
            is_self: false,
            is_video: false,
            url: None,
            gallery: Vec::new(),
            video_url: None,
            permalink,
            created_time,
        }
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = body;
        self
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_gallery(mut self, gallery: Vec<String>) -> Self {
        self.gallery = gallery;
        self
    }

    pub fn with_video(mut self, is_video: bool, video_url: Option<String>) -> Self {
        self.is_video = is_video;
        self.video_url = video_url;
        self
    }

    pub fn self_post(mut self, is_self: bool) -> Self {
        self.is_self = is_self;
        self
    }

    pub fn adult(mut self, is_adult: bool) -> Self {
        self.is_adult = is_adult;
        self
    }

    /// Content kind, first match wins: gallery, image, video, text, link
    pub fn kind(&self) -> ItemKind {
        if !self.gallery.is_empty() {
            return ItemKind::Gallery;
        }

        if let Some(url) = self.url.as_deref().filter(|_| !self.is_self) {
            if has_extension(url, IMAGE_EXTENSIONS) {
                return ItemKind::Image;
            }
            if self.is_video || has_extension(url, VIDEO_EXTENSIONS) || is_video_host(url) {
                return ItemKind::Video;
            }
            return ItemKind::Link;
        }

        if self.is_video {
            ItemKind::Video
        } else {
            ItemKind::Text
        }
    }

    /// Video that lives on reddit's own host and needs resolving before upload
    pub fn is_hosted_video(&self) -> bool {
        self.is_video
            || self
                .url
                .as_deref()
                .and_then(host_of)
                .is_some_and(|h| h == HOSTED_VIDEO_DOMAIN)
    }

    /// File URL for a linked video, with imgur `.gifv` pages mapped to their mp4
    pub fn direct_video_url(&self) -> Option<String> {
        let url = self.url.as_deref()?;
        if !has_extension(url, VIDEO_EXTENSIONS) {
            return None;
        }

        let Ok(mut parsed) = Url::parse(url) else {
            return Some(url.to_string());
        };
        let path = parsed.path().to_string();
        if let Some(stem) = path
            .len()
            .checked_sub(GIFV.len())
            .filter(|&at| path[at..].eq_ignore_ascii_case(GIFV))
            .map(|at| &path[..at])
        {
            parsed.set_path(&format!("{}.mp4", stem));
        }
        Some(parsed.to_string())
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_lowercase()))
}

fn has_extension(url: &str, extensions: &[&str]) -> bool {
    let path = match Url::parse(url) {
        Ok(u) => u.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    };
    extensions.iter().any(|ext| path.ends_with(ext))
}

fn is_video_host(url: &str) -> bool {
    host_of(url).is_some_and(|host| {
        VIDEO_HOSTS
            .iter()
            .any(|known| host == *known || host.ends_with(&format!(".{}", known)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: Option<&str>) -> Item {
        Item::new(
            "t1".to_string(),
            "pics".to_string(),
            "Title".to_string(),
            "https://reddit.com/r/pics/comments/t1/title/".to_string(),
            DateTime::from_timestamp(1728000000, 0).unwrap(),
        )
        .with_url(url.map(String::from))
    }

    #[test]
    fn test_gallery_wins() {
        let item = item(Some("https://i.redd.it/a.jpg"))
            .with_gallery(vec!["https://preview.redd.it/a.jpg".to_string()]);
        assert_eq!(item.kind(), ItemKind::Gallery);
    }

    #[test]
    fn test_image_extensions() {
        for url in [
            "https://i.redd.it/a.jpg",
            "https://i.imgur.com/b.PNG",
            "https://example.com/c.webp?width=640",
            "https://i.redd.it/d.gif",
        ] {
            assert_eq!(item(Some(url)).kind(), ItemKind::Image, "{}", url);
        }
    }

    #[test]
    fn test_video_detection() {
        assert_eq!(item(Some("https://v.redd.it/abc")).kind(), ItemKind::Video);
        assert_eq!(item(Some("https://www.youtube.com/watch?v=x")).kind(), ItemKind::Video);
        assert_eq!(item(Some("https://youtu.be/x")).kind(), ItemKind::Video);
        assert_eq!(item(Some("https://i.imgur.com/x.gifv")).kind(), ItemKind::Video);
        assert_eq!(item(Some("https://example.com/clip.mp4")).kind(), ItemKind::Video);
    }

    #[test]
    fn test_hosted_video() {
        assert!(item(Some("https://v.redd.it/abc")).is_hosted_video());
        assert!(!item(Some("https://youtu.be/x")).is_hosted_video());
        assert!(item(None).with_video(true, None).is_hosted_video());
    }

    #[test]
    fn test_self_post_is_text() {
        let item = item(Some("https://reddit.com/r/pics/comments/t1/title/"))
            .self_post(true)
            .with_body("hello".to_string());
        assert_eq!(item.kind(), ItemKind::Text);
    }

    #[test]
    fn test_other_urls_are_links() {
        let item = item(Some("https://blog.rust-lang.org/2024/10/17/Rust-1.82.0.html"));
        assert_eq!(item.kind(), ItemKind::Link);
        assert_eq!(item.direct_video_url(), None);
    }

    #[test]
    fn test_direct_video_url_reads_the_path() {
        for (url, direct) in [
            ("https://example.com/clip.mp4", "https://example.com/clip.mp4"),
            ("https://example.com/clip.webm", "https://example.com/clip.webm"),
            ("https://example.com/clip.MOV", "https://example.com/clip.MOV"),
            ("https://example.com/clip.mp4?x=1", "https://example.com/clip.mp4?x=1"),
            ("https://i.imgur.com/x.gifv", "https://i.imgur.com/x.mp4"),
            ("https://i.imgur.com/x.gifv?s=1", "https://i.imgur.com/x.mp4?s=1"),
        ] {
            assert_eq!(item(Some(url)).direct_video_url().as_deref(), Some(direct), "{}", url);
        }
    }

    #[test]
    fn test_video_pages_have_no_direct_url() {
        assert_eq!(item(Some("https://youtu.be/x")).direct_video_url(), None);
        assert_eq!(item(Some("https://v.redd.it/abc")).direct_video_url(), None);
        assert_eq!(item(None).direct_video_url(), None);
    }
}
