pub mod traits;
pub mod sqlite;

pub use traits::{CursorRepository, SourceRepository};
pub use sqlite::{SqliteCursorRepository, SqliteSourceRepository, SqliteStorage};
