#![forbid(unsafe_code)]

use super::{
    CATEGORY_COLUMNS, CreateCategoryRequest, MAX_TREE_DEPTH, SqliteStore, StoreError,
    UpdateCategoryRequest, constraint_message, is_constraint_violation, now_ms, read_category,
};
use rusqlite::{OptionalExtension, Transaction, params};
use tt_core::model::Category;
use tt_core::naming;

impl SqliteStore {
    pub fn category_create(
        &mut self,
        request: CreateCategoryRequest,
    ) -> Result<Category, StoreError> {
        let title = naming::normalize_title(&request.title)
            .map_err(|err| StoreError::InvalidInput(err.message()))?;
        let alias = naming::normalize_alias(request.alias.as_deref())
            .map_err(|err| StoreError::InvalidInput(err.message()))?;
        if request.creator.trim().is_empty() {
            return Err(StoreError::InvalidInput("creator must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        if let Some(parent_id) = request.parent_id {
            if !category_exists_tx(&tx, parent_id)? {
                return Err(StoreError::UnknownParent);
            }
        }

        if title_taken_tx(&tx, &title, request.parent_id, None)? {
            return Err(StoreError::TitleTaken);
        }

        let insert = tx.execute(
            r#"
            INSERT INTO categories(title, alias, parent_id, is_locked, sort_order, status, note, creator, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                title,
                alias,
                request.parent_id,
                request.is_locked,
                request.sort_order.max(0),
                request.status,
                request.note,
                request.creator,
                now_ms,
                now_ms
            ],
        );
        if let Err(err) = insert {
            return Err(map_category_conflict(err));
        }

        let id = tx.last_insert_rowid();
        // Unset sort order falls back to the category's own id, which keeps
        // siblings ranked in creation order.
        if request.sort_order <= 0 {
            tx.execute(
                "UPDATE categories SET sort_order = ?2 WHERE id = ?1",
                params![id, id],
            )?;
        }

        let category = category_row_tx(&tx, id)?.ok_or(StoreError::UnknownId)?;
        tx.commit()?;
        Ok(category)
    }

    pub fn category_update(
        &mut self,
        id: i64,
        request: UpdateCategoryRequest,
    ) -> Result<Category, StoreError> {
        if request == UpdateCategoryRequest::default() {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let Some(current) = category_row_tx(&tx, id)? else {
            return Err(StoreError::UnknownId);
        };

        let new_alias = match &request.alias {
            None => current.alias.clone(),
            Some(value) => naming::normalize_alias(value.as_deref())
                .map_err(|err| StoreError::InvalidInput(err.message()))?,
        };
        if current.is_locked && new_alias != current.alias {
            return Err(StoreError::LockedAliasChange {
                title: current.title.clone(),
            });
        }

        let new_parent_id = match request.parent_id {
            None => current.parent_id,
            Some(None) => None,
            Some(Some(parent_id)) => {
                if parent_id == id {
                    return Err(StoreError::ParentCycle);
                }
                if !category_exists_tx(&tx, parent_id)? {
                    return Err(StoreError::UnknownParent);
                }
                assert_no_cycle_tx(&tx, id, parent_id)?;
                Some(parent_id)
            }
        };

        let new_title = match &request.title {
            None => current.title.clone(),
            Some(title) => naming::normalize_title(title)
                .map_err(|err| StoreError::InvalidInput(err.message()))?,
        };
        if (new_title != current.title || new_parent_id != current.parent_id)
            && title_taken_tx(&tx, &new_title, new_parent_id, Some(id))?
        {
            return Err(StoreError::TitleTaken);
        }

        let new_is_locked = request.is_locked.unwrap_or(current.is_locked);
        let new_status = request.status.unwrap_or(current.status);
        let new_note = request.note.unwrap_or_else(|| current.note.clone());
        let new_sort_order = match request.sort_order {
            None => current.sort_order,
            Some(value) if value > 0 => value,
            Some(_) => id,
        };

        let update = tx.execute(
            r#"
            UPDATE categories
            SET title = ?2, alias = ?3, parent_id = ?4, is_locked = ?5, sort_order = ?6,
                status = ?7, note = ?8, updated_at_ms = ?9
            WHERE id = ?1
            "#,
            params![
                id,
                new_title,
                new_alias,
                new_parent_id,
                new_is_locked,
                new_sort_order,
                new_status,
                new_note,
                now_ms
            ],
        );
        if let Err(err) = update {
            return Err(map_category_conflict(err));
        }

        let category = category_row_tx(&tx, id)?.ok_or(StoreError::UnknownId)?;
        tx.commit()?;
        Ok(category)
    }

    /// Deletes a category together with its subtree and all their ties.
    /// Locked categories are rejected before anything is touched.
    pub fn category_delete(&mut self, id: i64) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        let Some(current) = category_row_tx(&tx, id)? else {
            return Err(StoreError::UnknownId);
        };
        if current.is_locked {
            return Err(StoreError::LockedCategoryDelete {
                title: current.title,
            });
        }

        tx.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    /// Full ordered scan used by the cache rebuild.
    pub fn categories_ordered(&self) -> Result<Vec<Category>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY sort_order ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], read_category)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn category_by_id(&self, id: i64) -> Result<Option<Category>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
                params![id],
                read_category,
            )
            .optional()?)
    }

    pub fn category_by_alias(&self, alias: &str) -> Result<Option<Category>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE alias = ?1"),
                params![alias],
                read_category,
            )
            .optional()?)
    }
}

fn category_exists_tx(tx: &Transaction<'_>, id: i64) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM categories WHERE id = ?1",
            params![id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn category_row_tx(tx: &Transaction<'_>, id: i64) -> Result<Option<Category>, StoreError> {
    Ok(tx
        .query_row(
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
            params![id],
            read_category,
        )
        .optional()?)
}

// The unique index does not catch duplicate titles under the root because
// SQLite treats NULL parent ids as distinct; probing inside the write
// transaction covers both cases.
fn title_taken_tx(
    tx: &Transaction<'_>,
    title: &str,
    parent_id: Option<i64>,
    exclude_id: Option<i64>,
) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM categories WHERE title = ?1 AND parent_id IS ?2 AND id IS NOT ?3",
            params![title, parent_id, exclude_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn assert_no_cycle_tx(
    tx: &Transaction<'_>,
    id: i64,
    new_parent_id: i64,
) -> Result<(), StoreError> {
    let mut current = Some(new_parent_id);
    for _ in 0..MAX_TREE_DEPTH {
        let Some(node) = current else {
            return Ok(());
        };
        if node == id {
            return Err(StoreError::ParentCycle);
        }
        current = tx
            .query_row(
                "SELECT parent_id FROM categories WHERE id = ?1",
                params![node],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .ok_or(StoreError::UnknownParent)?;
    }
    Err(StoreError::TreeDepthExceeded)
}

fn map_category_conflict(err: rusqlite::Error) -> StoreError {
    if is_constraint_violation(&err) {
        if let Some(message) = constraint_message(&err) {
            if message.contains("categories.alias") {
                return StoreError::AliasTaken;
            }
            if message.contains("categories.title") {
                return StoreError::TitleTaken;
            }
        }
    }
    StoreError::Sql(err)
}
