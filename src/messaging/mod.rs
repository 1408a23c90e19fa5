pub mod port;
pub mod telegram;
pub mod console;

pub use port::{MessagingPort, VideoUpload, CAPTION_LIMIT, MESSAGE_LIMIT};
pub use telegram::TelegramMessenger;
pub use console::ConsoleMessenger;
