use crate::domain::{SortMode, Source};
use crate::errors::{RelayError, RelayResult};
use crate::storage::traits::SourceRepository;
use crate::storage::sqlite::SqliteStorage;

pub struct SqliteSourceRepository {
    storage: SqliteStorage,
}

impl SqliteSourceRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

fn row_to_source(row: &rusqlite::Row<'_>) -> rusqlite::Result<Source> {
    let sort_mode: String = row.get(1)?;
    Ok(Source {
        name: row.get(0)?,
        sort_mode: sort_mode.parse().unwrap_or(SortMode::New),
        created_at: row.get(2)?,
    })
}

impl SourceRepository for SqliteSourceRepository {
    fn add(&self, source: &Source) -> RelayResult<()> {
        let conn = self.storage.connection()?;

        // Check if already exists (within the same connection to avoid deadlock)
        let mut stmt = conn.prepare("SELECT EXISTS(SELECT 1 FROM sources WHERE name = ?1)")?;
        let exists: bool = stmt.query_row([&source.name], |row| row.get(0))?;
        drop(stmt);

        if exists {
            return Err(RelayError::SourceAlreadyExists(source.name.clone()));
        }

        conn.execute(
            "INSERT INTO sources (name, sort_mode) VALUES (?1, ?2)",
            (&source.name, source.sort_mode.as_str()),
        )?;

        Ok(())
    }

    fn remove(&self, name: &str) -> RelayResult<bool> {
        let conn = self.storage.connection()?;
        let removed = conn.execute("DELETE FROM sources WHERE name = ?1", [name])?;
        Ok(removed > 0)
    }

    fn get_all(&self) -> RelayResult<Vec<Source>> {
        let conn = self.storage.connection()?;
        let mut stmt =
            conn.prepare("SELECT name, sort_mode, created_at FROM sources ORDER BY rowid")?;

        let sources = stmt.query_map([], row_to_source)?;
        sources.collect::<Result<Vec<_>, _>>().map_err(RelayError::from)
    }

    fn exists(&self, name: &str) -> RelayResult<bool> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare("SELECT EXISTS(SELECT 1 FROM sources WHERE name = ?1)")?;
        let exists: bool = stmt.query_row([name], |row| row.get(0))?;
        Ok(exists)
    }
}
