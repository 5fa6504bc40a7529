#![forbid(unsafe_code)]

use tt_core::entity::{EntityKind, EntityRef};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateCategoryRequest {
    pub title: String,
    pub alias: Option<String>,
    pub parent_id: Option<i64>,
    pub creator: String,
    pub is_locked: bool,
    pub status: Option<i64>,
    pub note: String,
    /// Zero or negative means "assign the category's own id on insert".
    pub sort_order: i64,
}

impl CreateCategoryRequest {
    pub fn new(title: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            alias: None,
            parent_id: None,
            creator: creator.into(),
            is_locked: false,
            status: None,
            note: String::new(),
            sort_order: 0,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn locked(mut self) -> Self {
        self.is_locked = true;
        self
    }
}

/// Outer `None` leaves a field untouched; inner `None` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateCategoryRequest {
    pub title: Option<String>,
    pub alias: Option<Option<String>>,
    pub parent_id: Option<Option<i64>>,
    pub is_locked: Option<bool>,
    pub status: Option<Option<i64>>,
    pub note: Option<String>,
    pub sort_order: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateTieRequest {
    pub category_id: i64,
    pub entity: EntityRef,
    pub creator: String,
    pub status: Option<i64>,
    pub note: String,
}

impl CreateTieRequest {
    pub fn new(category_id: i64, entity: EntityRef, creator: impl Into<String>) -> Self {
        Self {
            category_id,
            entity,
            creator: creator.into(),
            status: None,
            note: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListTiesRequest {
    pub category_ids: Vec<i64>,
    pub entity_kind: Option<EntityKind>,
    pub creator: Option<String>,
    pub status: Option<i64>,
}
