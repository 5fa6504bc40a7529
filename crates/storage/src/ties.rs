#![forbid(unsafe_code)]

use super::{
    CreateTieRequest, ListTiesRequest, SqliteStore, StoreError, in_placeholders,
    is_constraint_violation, now_ms,
};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params, params_from_iter};
use std::collections::{BTreeMap, HashMap};
use tt_core::entity::EntityRef;
use tt_core::model::{Tie, TieScope};

impl SqliteStore {
    pub fn tie_create(&mut self, request: CreateTieRequest) -> Result<Tie, StoreError> {
        if request.creator.trim().is_empty() {
            return Err(StoreError::InvalidInput("creator must not be empty"));
        }

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;

        let insert = tx.execute(
            r#"
            INSERT INTO ties(category_id, entity_kind, entity_id, creator, status, note, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                request.category_id,
                request.entity.kind.as_str(),
                request.entity.id,
                request.creator,
                request.status,
                request.note,
                now_ms
            ],
        );
        if let Err(err) = insert {
            // The only constraint on ties is the category foreign key.
            if is_constraint_violation(&err) {
                return Err(StoreError::UnknownId);
            }
            return Err(err.into());
        }

        let id = tx.last_insert_rowid();
        let tie = Tie {
            id,
            category_id: request.category_id,
            entity_kind: request.entity.kind.as_str().to_string(),
            entity_id: request.entity.id,
            creator: request.creator,
            status: request.status,
            note: request.note,
            created_at_ms: now_ms,
        };

        tx.commit()?;
        Ok(tie)
    }

    /// Removes every tie between the category and the entity. Ties are
    /// deleted by filter, never by tie id.
    pub fn ties_remove(&mut self, category_id: i64, entity: &EntityRef) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM ties WHERE category_id = ?1 AND entity_kind = ?2 AND entity_id = ?3",
            params![category_id, entity.kind.as_str(), entity.id],
        )?;
        tx.commit()?;
        Ok(deleted)
    }

    /// Grouped tie counts for the candidate categories. Categories without
    /// matching ties are absent from the result.
    pub fn ties_stats(
        &self,
        category_ids: &[i64],
        scope: &TieScope,
    ) -> Result<HashMap<i64, u64>, StoreError> {
        let mut stats = HashMap::new();
        if category_ids.is_empty() {
            return Ok(stats);
        }

        let mut sql = format!(
            "SELECT category_id, COUNT(*) FROM ties WHERE category_id IN ({})",
            in_placeholders(category_ids.len())
        );
        let mut sql_params = Vec::<Value>::new();
        for id in category_ids {
            sql_params.push(Value::Integer(*id));
        }
        if let Some(kind) = scope.kind() {
            sql.push_str(" AND entity_kind = ?");
            sql_params.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(entity_id) = scope.entity_id() {
            sql.push_str(" AND entity_id = ?");
            sql_params.push(Value::Integer(entity_id));
        }
        sql.push_str(" GROUP BY category_id");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(sql_params))?;
        while let Some(row) = rows.next()? {
            let category_id: i64 = row.get(0)?;
            let count: i64 = row.get(1)?;
            stats.insert(category_id, count.max(0) as u64);
        }
        Ok(stats)
    }

    /// Distinct ids of categories the entity is tied to.
    pub fn tie_category_ids_for(&self, entity: &EntityRef) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT category_id FROM ties
            WHERE entity_kind = ?1 AND entity_id = ?2
            ORDER BY category_id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![entity.kind.as_str(), entity.id], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn ties_list(&self, request: ListTiesRequest) -> Result<Vec<Tie>, StoreError> {
        if request.category_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT id, category_id, entity_kind, entity_id, creator, status, note, created_at_ms \
             FROM ties WHERE category_id IN ({})",
            in_placeholders(request.category_ids.len())
        );
        let mut sql_params = Vec::<Value>::new();
        for id in &request.category_ids {
            sql_params.push(Value::Integer(*id));
        }
        if let Some(kind) = &request.entity_kind {
            sql.push_str(" AND entity_kind = ?");
            sql_params.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(creator) = &request.creator {
            sql.push_str(" AND creator = ?");
            sql_params.push(Value::Text(creator.clone()));
        }
        if let Some(status) = request.status {
            sql.push_str(" AND status = ?");
            sql_params.push(Value::Integer(status));
        }
        sql.push_str(" ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(sql_params))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(Tie {
                id: row.get(0)?,
                category_id: row.get(1)?,
                entity_kind: row.get(2)?,
                entity_id: row.get(3)?,
                creator: row.get(4)?,
                status: row.get(5)?,
                note: row.get(6)?,
                created_at_ms: row.get(7)?,
            });
        }
        Ok(out)
    }

    /// Tied entity ids grouped by entity kind.
    pub fn linked_entities(
        &self,
        category_ids: Option<&[i64]>,
    ) -> Result<BTreeMap<String, Vec<i64>>, StoreError> {
        let mut sql =
            String::from("SELECT DISTINCT entity_kind, entity_id FROM ties");
        let mut sql_params = Vec::<Value>::new();
        if let Some(ids) = category_ids {
            if ids.is_empty() {
                return Ok(BTreeMap::new());
            }
            sql.push_str(&format!(
                " WHERE category_id IN ({})",
                in_placeholders(ids.len())
            ));
            for id in ids {
                sql_params.push(Value::Integer(*id));
            }
        }
        sql.push_str(" ORDER BY entity_kind ASC, entity_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(sql_params))?;
        let mut out = BTreeMap::<String, Vec<i64>>::new();
        while let Some(row) = rows.next()? {
            let kind: String = row.get(0)?;
            let entity_id: i64 = row.get(1)?;
            out.entry(kind).or_default().push(entity_id);
        }
        Ok(out)
    }

    /// Tied entity ids grouped first by category, then by entity kind.
    pub fn linked_entities_by_category(
        &self,
    ) -> Result<BTreeMap<i64, BTreeMap<String, Vec<i64>>>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT category_id, entity_kind, entity_id FROM ties
            ORDER BY category_id ASC, entity_kind ASC, entity_id ASC
            "#,
        )?;
        let mut rows = stmt.query([])?;
        let mut out = BTreeMap::<i64, BTreeMap<String, Vec<i64>>>::new();
        while let Some(row) = rows.next()? {
            let category_id: i64 = row.get(0)?;
            let kind: String = row.get(1)?;
            let entity_id: i64 = row.get(2)?;
            out.entry(category_id)
                .or_default()
                .entry(kind)
                .or_default()
                .push(entity_id);
        }
        Ok(out)
    }

    /// Number of ties the entity has within the given categories. Used by
    /// editor min/max checks.
    pub fn ties_count_for(
        &self,
        category_ids: &[i64],
        entity: &EntityRef,
    ) -> Result<usize, StoreError> {
        if category_ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "SELECT COUNT(*) FROM ties WHERE entity_kind = ? AND entity_id = ? AND category_id IN ({})",
            in_placeholders(category_ids.len())
        );
        let mut sql_params = Vec::<Value>::new();
        sql_params.push(Value::Text(entity.kind.as_str().to_string()));
        sql_params.push(Value::Integer(entity.id));
        for id in category_ids {
            sql_params.push(Value::Integer(*id));
        }
        let count = self
            .conn
            .query_row(&sql, params_from_iter(sql_params), |row| {
                row.get::<_, i64>(0)
            })
            .optional()?
            .unwrap_or(0);
        Ok(count.max(0) as usize)
    }
}
