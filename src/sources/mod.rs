pub mod traits;
pub mod reddit;

pub use traits::{ContentProvider, VideoResolver};
pub use self::reddit::RedditSource;
