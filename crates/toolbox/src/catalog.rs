#![forbid(unsafe_code)]

use crate::cache::{CategoryCache, TiedCategory};
use crate::config::Config;
use crate::error::CacheError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tt_core::entity::EntityRef;
use tt_core::model::{Category, Parent, Tie, TieScope};
use tt_storage::{
    CreateCategoryRequest, CreateTieRequest, ListTiesRequest, SqliteStore, StoreError,
    UpdateCategoryRequest,
};

/// Application-level entry point owning the store and the category cache.
/// Constructed once at startup and shared; replaces any notion of a global
/// cache singleton. Category writes notify the cache on the success path
/// only, so a rejected write leaves the held snapshot untouched. Tie
/// writes never invalidate: ties are aggregated live. Cached reads hand
/// the cache the store mutex unlocked; it is taken only when a rebuild or
/// tie aggregation actually needs storage.
#[derive(Debug)]
pub struct Catalog {
    pub(crate) store: Mutex<SqliteStore>,
    pub(crate) cache: CategoryCache,
}

impl Catalog {
    pub fn open(config: &Config) -> Result<Self, StoreError> {
        let store = match &config.db_file {
            Some(db_file) => SqliteStore::open_with_db_file(&config.storage_dir, db_file)?,
            None => SqliteStore::open(&config.storage_dir)?,
        };
        Ok(Self::with_store(store))
    }

    pub fn with_store(store: SqliteStore) -> Self {
        Self {
            store: Mutex::new(store),
            cache: CategoryCache::new(),
        }
    }

    pub fn cache(&self) -> &CategoryCache {
        &self.cache
    }

    /// Directory the underlying database lives in.
    pub fn storage_dir(&self) -> PathBuf {
        self.store().storage_dir().to_path_buf()
    }

    pub(crate) fn store(&self) -> MutexGuard<'_, SqliteStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- category writes (cache-invalidating) ---

    pub fn category_create(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<Category, StoreError> {
        let result = self.store().category_create(request);
        if result.is_ok() {
            self.cache.invalidate();
        }
        result
    }

    /// Shorthand mirroring the typical "add" operation: title, creator and
    /// an optional parent.
    pub fn category_add(
        &self,
        title: &str,
        creator: &str,
        parent_id: Option<i64>,
    ) -> Result<Category, StoreError> {
        let mut request = CreateCategoryRequest::new(title, creator);
        request.parent_id = parent_id;
        self.category_create(request)
    }

    pub fn category_update(
        &self,
        id: i64,
        request: UpdateCategoryRequest,
    ) -> Result<Category, StoreError> {
        let result = self.store().category_update(id, request);
        if result.is_ok() {
            self.cache.invalidate();
        }
        result
    }

    pub fn category_delete(&self, id: i64) -> Result<(), StoreError> {
        let result = self.store().category_delete(id);
        if result.is_ok() {
            self.cache.invalidate();
        }
        result
    }

    // --- tie writes (no invalidation) ---

    pub fn tie_create(&self, request: CreateTieRequest) -> Result<Tie, StoreError> {
        self.store().tie_create(request)
    }

    /// Ties a concrete entity to a category.
    pub fn tag(&self, entity: &EntityRef, category_id: i64, creator: &str) -> Result<Tie, StoreError> {
        self.tie_create(CreateTieRequest::new(category_id, entity.clone(), creator))
    }

    /// Removes every tie between the entity and the category.
    pub fn untag(&self, entity: &EntityRef, category_id: i64) -> Result<usize, StoreError> {
        self.store().ties_remove(category_id, entity)
    }

    // --- cached reads ---

    pub fn category_by_id(&self, id: i64) -> Result<Option<Category>, CacheError> {
        self.cache.category_by_id(&self.store, id)
    }

    pub fn category_by_alias(&self, alias: &str) -> Result<Option<Category>, CacheError> {
        self.cache.category_by_alias(&self.store, alias)
    }

    pub fn child_ids(&self, parent: &Parent) -> Result<Vec<i64>, CacheError> {
        self.cache.child_ids(&self.store, parent)
    }

    pub fn children_for(
        &self,
        parent: &Parent,
        only_with_aliases: bool,
    ) -> Result<Vec<Category>, CacheError> {
        self.cache.children_for(&self.store, parent, only_with_aliases)
    }

    pub fn find_category(
        &self,
        parent: &Parent,
        title: &str,
    ) -> Result<Option<Category>, CacheError> {
        self.cache.find_category(&self.store, parent, title)
    }

    pub fn parents_for(&self, child_ids: &[i64]) -> Result<BTreeSet<Parent>, CacheError> {
        self.cache.parents_for(&self.store, child_ids)
    }

    pub fn sort_aliases(&self, parents: &[Parent]) -> Result<Vec<Parent>, CacheError> {
        self.cache.sort_aliases(&self.store, parents)
    }

    pub fn ties_stats(
        &self,
        category_ids: &[i64],
        scope: &TieScope,
    ) -> Result<HashMap<i64, u64>, CacheError> {
        self.cache.ties_stats(&self.store, category_ids, scope)
    }

    pub fn children_for_many(
        &self,
        parents: &[Parent],
    ) -> Result<Vec<(Parent, Vec<Category>)>, CacheError> {
        self.cache.children_for_many(&self.store, parents)
    }

    pub fn tied_children_for(
        &self,
        parent: &Parent,
        scope: &TieScope,
    ) -> Result<Vec<TiedCategory>, CacheError> {
        self.cache.tied_children_for(&self.store, parent, scope)
    }

    pub fn tied_children_for_many(
        &self,
        parents: &[Parent],
        scope: &TieScope,
    ) -> Result<Vec<(Parent, Vec<TiedCategory>)>, CacheError> {
        self.cache.tied_children_for_many(&self.store, parents, scope)
    }

    // --- live tie reads ---

    pub fn tie_category_ids_for(&self, entity: &EntityRef) -> Result<Vec<i64>, CacheError> {
        Ok(self.store().tie_category_ids_for(entity)?)
    }

    pub fn ties_list(&self, request: ListTiesRequest) -> Result<Vec<Tie>, CacheError> {
        Ok(self.store().ties_list(request)?)
    }

    pub fn ties_count_for(
        &self,
        category_ids: &[i64],
        entity: &EntityRef,
    ) -> Result<usize, CacheError> {
        Ok(self.store().ties_count_for(category_ids, entity)?)
    }

    pub fn linked_entities(
        &self,
        category_ids: Option<&[i64]>,
    ) -> Result<BTreeMap<String, Vec<i64>>, CacheError> {
        Ok(self.store().linked_entities(category_ids)?)
    }

    pub fn linked_entities_by_category(
        &self,
    ) -> Result<BTreeMap<i64, BTreeMap<String, Vec<i64>>>, CacheError> {
        Ok(self.store().linked_entities_by_category()?)
    }
}
