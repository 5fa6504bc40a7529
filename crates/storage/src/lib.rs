#![forbid(unsafe_code)]

mod categories;
mod error;
mod requests;
mod ties;

pub use error::StoreError;
pub use requests::*;

use rusqlite::{Connection, ErrorCode, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tt_core::model::Category;

const DB_FILE: &str = "tagtree.db";
const MAX_TREE_DEPTH: usize = 128;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_db_file(storage_dir, DB_FILE)
    }

    pub fn open_with_db_file(
        storage_dir: impl AsRef<Path>,
        db_file: &str,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(db_file);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        install_schema(&conn)?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS categories (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          title TEXT NOT NULL,
          alias TEXT UNIQUE,
          parent_id INTEGER REFERENCES categories(id) ON DELETE CASCADE,
          is_locked INTEGER NOT NULL DEFAULT 0,
          sort_order INTEGER NOT NULL DEFAULT 0,
          status INTEGER,
          note TEXT NOT NULL DEFAULT '',
          creator TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          UNIQUE (title, parent_id)
        );

        CREATE TABLE IF NOT EXISTS ties (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
          entity_kind TEXT NOT NULL,
          entity_id INTEGER NOT NULL,
          creator TEXT NOT NULL,
          status INTEGER,
          note TEXT NOT NULL DEFAULT '',
          created_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);
        CREATE INDEX IF NOT EXISTS idx_categories_sort ON categories(sort_order);
        CREATE INDEX IF NOT EXISTS idx_ties_category ON ties(category_id);
        CREATE INDEX IF NOT EXISTS idx_ties_entity ON ties(entity_kind, entity_id);
        "#,
    )?;
    Ok(())
}

fn now_ms() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_millis() as i64
}

const CATEGORY_COLUMNS: &str =
    "id, title, alias, parent_id, is_locked, sort_order, status, note, creator, created_at_ms, updated_at_ms";

fn read_category(row: &Row<'_>) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        title: row.get(1)?,
        alias: row.get(2)?,
        parent_id: row.get(3)?,
        is_locked: row.get(4)?,
        sort_order: row.get(5)?,
        status: row.get(6)?,
        note: row.get(7)?,
        creator: row.get(8)?,
        created_at_ms: row.get(9)?,
        updated_at_ms: row.get(10)?,
    })
}

fn in_placeholders(count: usize) -> String {
    let mut placeholders = String::new();
    for idx in 0..count {
        if idx > 0 {
            placeholders.push(',');
        }
        placeholders.push('?');
    }
    placeholders
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("FOREIGN KEY constraint failed")
                })
        }
        _ => false,
    }
}

fn constraint_message(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(_, message) => message.as_deref(),
        _ => None,
    }
}
