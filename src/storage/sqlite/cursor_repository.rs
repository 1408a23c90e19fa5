use chrono::DateTime;

use crate::domain::Cursor;
use crate::errors::{RelayError, RelayResult};
use crate::storage::traits::CursorRepository;
use crate::storage::sqlite::SqliteStorage;

pub struct SqliteCursorRepository {
    storage: SqliteStorage,
}

impl SqliteCursorRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

fn row_to_cursor(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cursor> {
    let seconds: i64 = row.get(2)?;
    let last_seen_time = DateTime::from_timestamp(seconds, 0)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(2, seconds))?;

    Ok(Cursor {
        source_name: row.get(0)?,
        last_item_id: row.get(1)?,
        last_seen_time,
    })
}

impl CursorRepository for SqliteCursorRepository {
    fn get(&self, source_name: &str) -> RelayResult<Option<Cursor>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT source_name, last_item_id, last_seen_time FROM cursors WHERE source_name = ?1",
        )?;

        match stmt.query_row([source_name], row_to_cursor) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(RelayError::from(e)),
        }
    }

    fn advance(&self, cursor: &Cursor) -> RelayResult<bool> {
        let conn = self.storage.connection()?;

        // Only registered sources get a cursor, and a cursor never moves back in time
        let changed = conn.execute(
            "INSERT INTO cursors (source_name, last_item_id, last_seen_time)
             SELECT ?1, ?2, ?3 WHERE EXISTS (SELECT 1 FROM sources WHERE name = ?1)
             ON CONFLICT(source_name) DO UPDATE SET
                 last_item_id = excluded.last_item_id,
                 last_seen_time = excluded.last_seen_time,
                 updated_at = datetime('now')
             WHERE excluded.last_seen_time >= cursors.last_seen_time",
            (
                &cursor.source_name,
                &cursor.last_item_id,
                cursor.last_seen_time.timestamp(),
            ),
        )?;

        Ok(changed > 0)
    }

    fn reset(&self, source_name: &str) -> RelayResult<bool> {
        let conn = self.storage.connection()?;
        let removed = conn.execute("DELETE FROM cursors WHERE source_name = ?1", [source_name])?;
        Ok(removed > 0)
    }

    fn get_all(&self) -> RelayResult<Vec<Cursor>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(
            "SELECT source_name, last_item_id, last_seen_time FROM cursors ORDER BY source_name",
        )?;

        let cursors = stmt.query_map([], row_to_cursor)?;
        cursors.collect::<Result<Vec<_>, _>>().map_err(RelayError::from)
    }
}
