//! SQLite-backed preference store.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use super::{PrefError, PrefList, PrefResult, PreferenceSet, PreferenceStore};

const PREFS_FORMAT_VERSION: &str = "1";

/// SQLite implementation of [`PreferenceStore`].
///
/// Each collection is stored as ordered `(list, position, key)` rows; a save
/// replaces every row inside one transaction.
pub struct SqlitePreferenceStore {
    conn: Connection,
}

impl SqlitePreferenceStore {
    /// Opens or creates a store at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PrefResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory store.
    pub fn open_in_memory() -> PrefResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PrefResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES ('format_version', ?1)",
            params![PREFS_FORMAT_VERSION],
        )?;
        let version: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'format_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if version.as_deref() != Some(PREFS_FORMAT_VERSION) {
            return Err(PrefError::Unavailable(format!(
                "unsupported preference format: {version:?}"
            )));
        }

        Ok(Self { conn })
    }

    /// Milliseconds since epoch of the last successful save, if any.
    pub fn last_saved_ms(&self) -> PrefResult<Option<u64>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'last_saved_ms'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(|v| v.parse().ok()))
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn load(&mut self) -> PrefResult<PreferenceSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT list, key FROM preferences ORDER BY list ASC, position ASC")?;
        let rows = stmt.query_map([], |row| {
            let list: String = row.get(0)?;
            let key: String = row.get(1)?;
            Ok((list, key))
        })?;

        let mut prefs = PreferenceSet::default();
        for row in rows {
            let (list, key) = row?;
            // Unknown list names are dropped; the next save removes them.
            if let Some(list) = PrefList::parse(&list) {
                prefs.list_mut(list).push(key);
            }
        }
        Ok(prefs)
    }

    fn save(&mut self, prefs: &PreferenceSet) -> PrefResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM preferences", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO preferences(list, position, key) VALUES (?1, ?2, ?3)")?;
            for list in PrefList::ALL {
                for (position, key) in prefs.list(list).iter().enumerate() {
                    stmt.execute(params![list.as_str(), position as i64, key])?;
                }
            }
        }
        tx.execute(
            "INSERT INTO meta(key, value) VALUES ('last_saved_ms', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![now_ms().to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
