mod connection;
mod source_repository;
mod cursor_repository;

pub use connection::SqliteStorage;
pub use source_repository::SqliteSourceRepository;
pub use cursor_repository::SqliteCursorRepository;
