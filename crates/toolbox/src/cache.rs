#![forbid(unsafe_code)]

use crate::error::CacheError;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tt_core::model::{Category, Parent, TieScope};
use tt_storage::SqliteStore;

/// A category paired with its tie count for one aggregation scope. Cached
/// `Category` values are shared between readers and are never annotated in
/// place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TiedCategory {
    pub category: Category,
    pub ties_num: u64,
}

/// One wholesale index over the category table. Built in a single ordered
/// scan, published atomically, never patched afterwards.
#[derive(Debug)]
struct Snapshot {
    by_id: HashMap<i64, Category>,
    by_alias: HashMap<String, i64>,
    bucket_order: Vec<Parent>,
    buckets: HashMap<Parent, Vec<i64>>,
}

impl Snapshot {
    fn build(categories: Vec<Category>) -> Self {
        let mut by_id = HashMap::with_capacity(categories.len());
        for category in &categories {
            by_id.insert(category.id, category.clone());
        }

        let mut by_alias = HashMap::new();
        for category in &categories {
            if let Some(alias) = &category.alias {
                by_alias.insert(alias.clone(), category.id);
            }
        }

        // Categories arrive sorted by sort order and buckets are append
        // only, so every bucket ends up sorted without a second pass. A
        // parent outside this snapshot, or one without an alias, files its
        // children under the root bucket.
        let mut bucket_order = Vec::new();
        let mut buckets: HashMap<Parent, Vec<i64>> = HashMap::new();
        for category in &categories {
            let parent = match category.parent_id.and_then(|pid| by_id.get(&pid)) {
                Some(parent_category) => Parent::from_alias(parent_category.alias.as_deref()),
                None => Parent::Root,
            };
            buckets
                .entry(parent.clone())
                .or_insert_with(|| {
                    bucket_order.push(parent.clone());
                    Vec::new()
                })
                .push(category.id);
        }

        Self {
            by_id,
            by_alias,
            bucket_order,
            buckets,
        }
    }

    fn child_ids(&self, parent: &Parent) -> &[i64] {
        self.buckets.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Read-optimized index over the whole category tree. Lazily rebuilt from
/// storage on first read after an invalidation; queries on a populated
/// cache never touch storage except for tie aggregation. The store mutex
/// is taken only when storage is actually consulted, so snapshot reads
/// never wait behind an in-flight write or aggregation.
#[derive(Debug)]
pub struct CategoryCache {
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    rebuilds: AtomicU64,
}

impl Default for CategoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryCache {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(None),
            rebuilds: AtomicU64::new(0),
        }
    }

    /// Drops the held snapshot. Called by the persistence wrapper after a
    /// successful category write; the next read rebuilds.
    pub fn invalidate(&self) {
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    /// Number of snapshot rebuilds performed so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }

    fn load(&self, store: &Mutex<SqliteStore>) -> Result<Arc<Snapshot>, CacheError> {
        {
            let guard = self
                .snapshot
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(snapshot) = guard.as_ref() {
                return Ok(Arc::clone(snapshot));
            }
        }

        // Built outside the write lock: a concurrent rebuild is wasteful
        // but correct, and readers of a populated snapshot never block on
        // an unrelated rebuild. Last publish wins. The store mutex is held
        // for the scan only.
        let categories = {
            let guard = store.lock().unwrap_or_else(PoisonError::into_inner);
            guard.categories_ordered()?
        };
        let snapshot = Arc::new(Snapshot::build(categories));
        self.rebuilds.fetch_add(1, Ordering::Relaxed);

        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn category_by_id(
        &self,
        store: &Mutex<SqliteStore>,
        id: i64,
    ) -> Result<Option<Category>, CacheError> {
        let snapshot = self.load(store)?;
        Ok(snapshot.by_id.get(&id).cloned())
    }

    pub fn category_by_alias(
        &self,
        store: &Mutex<SqliteStore>,
        alias: &str,
    ) -> Result<Option<Category>, CacheError> {
        let snapshot = self.load(store)?;
        Ok(snapshot
            .by_alias
            .get(alias)
            .and_then(|id| snapshot.by_id.get(id))
            .cloned())
    }

    /// Ids of the direct children under the given parent bucket, in sort
    /// order. Unknown parents yield an empty list, not an error.
    pub fn child_ids(&self, store: &Mutex<SqliteStore>, parent: &Parent) -> Result<Vec<i64>, CacheError> {
        let snapshot = self.load(store)?;
        Ok(snapshot.child_ids(parent).to_vec())
    }

    pub fn children_for(
        &self,
        store: &Mutex<SqliteStore>,
        parent: &Parent,
        only_with_aliases: bool,
    ) -> Result<Vec<Category>, CacheError> {
        let snapshot = self.load(store)?;
        let mut children = Vec::new();
        for id in snapshot.child_ids(parent) {
            let Some(category) = snapshot.by_id.get(id) else {
                continue;
            };
            if only_with_aliases && category.alias.is_none() {
                continue;
            }
            children.push(category.clone());
        }
        Ok(children)
    }

    /// Case-insensitive exact title match among the parent's direct
    /// children; first match in child order wins.
    pub fn find_category(
        &self,
        store: &Mutex<SqliteStore>,
        parent: &Parent,
        title: &str,
    ) -> Result<Option<Category>, CacheError> {
        let snapshot = self.load(store)?;
        let wanted = title.trim().to_lowercase();
        for id in snapshot.child_ids(parent) {
            let Some(category) = snapshot.by_id.get(id) else {
                continue;
            };
            if category.title.to_lowercase() == wanted {
                return Ok(Some(category.clone()));
            }
        }
        Ok(None)
    }

    /// Parent buckets whose child lists intersect the given id set.
    pub fn parents_for(
        &self,
        store: &Mutex<SqliteStore>,
        child_ids: &[i64],
    ) -> Result<BTreeSet<Parent>, CacheError> {
        let snapshot = self.load(store)?;
        let wanted: BTreeSet<i64> = child_ids.iter().copied().collect();
        let mut parents = BTreeSet::new();
        for parent in &snapshot.bucket_order {
            let children = snapshot.child_ids(parent);
            if children.iter().any(|id| wanted.contains(id)) {
                parents.insert(parent.clone());
            }
        }
        Ok(parents)
    }

    /// Filters the input down to valid parent-bucket keys and reorders it
    /// to the bucket iteration order, i.e. the storage scan order. Makes
    /// presentation order independent of how the caller collected parents.
    pub fn sort_aliases(
        &self,
        store: &Mutex<SqliteStore>,
        parents: &[Parent],
    ) -> Result<Vec<Parent>, CacheError> {
        let snapshot = self.load(store)?;
        let mut sorted = Vec::new();
        for parent in &snapshot.bucket_order {
            if parents.contains(parent) {
                sorted.push(parent.clone());
            }
        }
        Ok(sorted)
    }

    /// Grouped tie counts, delegated to storage. The cache only supplies
    /// candidate ids (derived from its tree index by the callers) and the
    /// scope; categories with no matching ties are absent from the map.
    pub fn ties_stats(
        &self,
        store: &Mutex<SqliteStore>,
        category_ids: &[i64],
        scope: &TieScope,
    ) -> Result<HashMap<i64, u64>, CacheError> {
        let guard = store.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.ties_stats(category_ids, scope)?)
    }

    /// Plain listings for a batch of parents, keyed in the order given.
    pub fn children_for_many(
        &self,
        store: &Mutex<SqliteStore>,
        parents: &[Parent],
    ) -> Result<Vec<(Parent, Vec<Category>)>, CacheError> {
        let mut out = Vec::with_capacity(parents.len());
        for parent in parents {
            out.push((parent.clone(), self.children_for(store, parent, false)?));
        }
        Ok(out)
    }

    /// Children of one parent that have at least one tie in the scope,
    /// each paired with its tie count, in child order.
    pub fn tied_children_for(
        &self,
        store: &Mutex<SqliteStore>,
        parent: &Parent,
        scope: &TieScope,
    ) -> Result<Vec<TiedCategory>, CacheError> {
        let snapshot = self.load(store)?;
        let child_ids = snapshot.child_ids(parent);
        if child_ids.is_empty() {
            return Ok(Vec::new());
        }
        let stats = {
            let guard = store.lock().unwrap_or_else(PoisonError::into_inner);
            guard.ties_stats(child_ids, scope)?
        };
        let mut tied = Vec::new();
        for id in child_ids {
            let Some(ties_num) = stats.get(id).copied() else {
                continue;
            };
            let Some(category) = snapshot.by_id.get(id) else {
                continue;
            };
            tied.push(TiedCategory {
                category: category.clone(),
                ties_num,
            });
        }
        Ok(tied)
    }

    pub fn tied_children_for_many(
        &self,
        store: &Mutex<SqliteStore>,
        parents: &[Parent],
        scope: &TieScope,
    ) -> Result<Vec<(Parent, Vec<TiedCategory>)>, CacheError> {
        let mut out = Vec::with_capacity(parents.len());
        for parent in parents {
            out.push((parent.clone(), self.tied_children_for(store, parent, scope)?));
        }
        Ok(out)
    }
}
