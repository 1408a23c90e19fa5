pub mod source;
pub mod cursor;
pub mod item;
pub mod payload;
pub mod identity;

pub use source::{SortMode, Source, SourceStatus};
pub use cursor::Cursor;
pub use item::{Item, ItemKind};
pub use payload::{Media, Payload, RenderOptions, Renderer, VideoRef};
pub use identity::{ChatId, UserId};
