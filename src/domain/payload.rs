use super::{Item, ItemKind};
use crate::messaging::MESSAGE_LIMIT;

/// Prefix of every rendered adult item
pub const ADULT_MARKER: &str = "🔞 [NSFW] ";

/// Appended to bodies cut at the character ceiling
pub const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub body_limit: usize,
    pub gallery_limit: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            body_limit: 500,
            gallery_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoRef {
    /// Needs resolve-and-download through the content provider
    Hosted { item_id: String },
    /// Direct file URL the messenger can fetch itself
    Direct(String),
    /// Page on a third-party video site, sent as a link preview
    External(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    None,
    Photo(String),
    Gallery(Vec<String>),
    Video(VideoRef),
    Link(String),
}

/// A rendered item ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub item_id: String,
    pub kind: ItemKind,
    /// Telegram HTML
    pub text: String,
    pub media: Media,
    /// Permalink message used when native delivery fails
    pub fallback: String,
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn render(&self, item: &Item) -> Payload {
        let kind = item.kind();
        let media = self.media_for(item, kind);

        let marker = if item.is_adult { ADULT_MARKER } else { "" };
        let title = escape_html(&item.title);
        let permalink = escape_html(&item.permalink);

        let mut text = format!(
            "{}<b>{}</b>\n\n📍 r/{}\n",
            marker,
            title,
            escape_html(&item.source)
        );

        let mut tail = format!("🔗 <a href=\"{}\">View on Reddit</a>\n", permalink);
        tail.push_str(&format!(
            "🕒 {}",
            item.created_time.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        match (&media, &item.video_url) {
            (Media::Link(url), _) => {
                tail.push_str(&format!(
                    "\n🔗 <a href=\"{}\">External Link</a>",
                    escape_html(url)
                ));
            }
            (Media::Video(_), Some(direct)) => {
                tail.push_str(&format!(
                    "\n📹 <a href=\"{}\">Direct Video Link</a>",
                    escape_html(direct)
                ));
            }
            _ => {}
        }

        if !item.body.trim().is_empty() {
            // The body gives way so the whole message fits in one send
            let room = MESSAGE_LIMIT
                .saturating_sub(text.chars().count() + tail.chars().count() + 2);
            if room > TRUNCATION_MARKER.len() {
                text.push_str(&fit_body(&item.body, self.options.body_limit, room));
                text.push_str("\n\n");
            }
        }
        text.push_str(&tail);

        Payload {
            item_id: item.id.clone(),
            kind,
            text,
            media,
            fallback: format!("{}{}\n{}", marker, title, permalink),
        }
    }

    fn media_for(&self, item: &Item, kind: ItemKind) -> Media {
        let url = item.url.clone().unwrap_or_default();
        match kind {
            ItemKind::Text => Media::None,
            ItemKind::Image => Media::Photo(url),
            ItemKind::Link => Media::Link(url),
            ItemKind::Gallery => Media::Gallery(
                item.gallery
                    .iter()
                    .take(self.options.gallery_limit)
                    .cloned()
                    .collect(),
            ),
            ItemKind::Video if item.is_hosted_video() => Media::Video(VideoRef::Hosted {
                item_id: item.id.clone(),
            }),
            ItemKind::Video => match item.direct_video_url() {
                Some(direct) => Media::Video(VideoRef::Direct(direct)),
                None => Media::Video(VideoRef::External(url)),
            },
        }
    }
}

/// Cut a body to `limit` characters, appending the truncation marker when cut
pub fn truncate_body(body: &str, limit: usize) -> String {
    if body.chars().count() <= limit {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(limit).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Escaped body cut to `limit` characters, and further to at most `room`
/// characters of HTML. Cuts fall between source characters so no entity is split.
fn fit_body(body: &str, limit: usize, room: usize) -> String {
    let escaped = escape_html(&truncate_body(body, limit));
    if escaped.chars().count() <= room {
        return escaped;
    }

    let budget = room.saturating_sub(TRUNCATION_MARKER.len());
    let mut cut = String::new();
    let mut used = 0;
    let mut buf = [0u8; 4];
    for c in body.chars() {
        let piece = escape_html(c.encode_utf8(&mut buf));
        let width = piece.chars().count();
        if used + width > budget {
            break;
        }
        used += width;
        cut.push_str(&piece);
    }
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Escape text for Telegram HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
