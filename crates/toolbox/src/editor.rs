#![forbid(unsafe_code)]

use crate::catalog::Catalog;
use crate::error::CacheError;
use crate::list::CategoryList;
use tt_core::model::Category;
use tt_storage::StoreError;

/// What a list's editor allows. Mirrors the classic tagging widget rules:
/// adding ties is on by default, destructive operations are opt-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorRules {
    pub allow_add: bool,
    pub allow_remove: bool,
    pub allow_new: bool,
    pub min_num: Option<usize>,
    pub max_num: Option<usize>,
}

impl Default for EditorRules {
    fn default() -> Self {
        Self {
            allow_add: true,
            allow_remove: false,
            allow_new: false,
            min_num: None,
            max_num: None,
        }
    }
}

impl EditorRules {
    pub fn allowing_remove(mut self) -> Self {
        self.allow_remove = true;
        self
    }

    pub fn allowing_new(mut self) -> Self {
        self.allow_new = true;
        self
    }

    pub fn with_min(mut self, min: usize) -> Self {
        self.min_num = Some(min);
        self
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max_num = Some(max);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategoryAction {
    Add { title: String },
    Remove { category_id: i64 },
}

#[derive(Debug)]
pub enum EditorError {
    UnknownList,
    EditorDisabled,
    ActionNotAllowed {
        action: &'static str,
        list_title: String,
    },
    EmptyTitle,
    UnknownCategory(i64),
    LockedCategory {
        ident: String,
    },
    NotInList {
        ident: String,
        list_title: String,
    },
    MinNumReached {
        min: usize,
        list_title: String,
    },
    MaxNumReached {
        max: usize,
        list_title: String,
    },
    NewCategoriesForbidden {
        title: String,
        list_title: String,
    },
    Cache(CacheError),
    Store(StoreError),
}

impl std::fmt::Display for EditorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownList => write!(f, "unknown category list"),
            Self::EditorDisabled => write!(f, "editor is disabled for this list"),
            Self::ActionNotAllowed { action, list_title } => {
                write!(f, "`{action}` is not supported by `{list_title}`")
            }
            Self::EmptyTitle => write!(f, "category title must not be empty"),
            Self::UnknownCategory(id) => write!(f, "unknown category `{id}`"),
            Self::LockedCategory { ident } => {
                write!(f, "category `{ident}` is locked")
            }
            Self::NotInList { ident, list_title } => {
                write!(f, "category `{ident}` is not a child of `{list_title}`")
            }
            Self::MinNumReached { min, list_title } => {
                write!(f, "`{list_title}` requires at least {min} subcategories")
            }
            Self::MaxNumReached { max, list_title } => {
                write!(f, "`{list_title}` can have at most {max} subcategories")
            }
            Self::NewCategoriesForbidden { title, list_title } => {
                write!(
                    f,
                    "unable to create new category `{title}` inside `{list_title}`"
                )
            }
            Self::Cache(err) => write!(f, "cache: {err}"),
            Self::Store(err) => write!(f, "store: {err}"),
        }
    }
}

impl std::error::Error for EditorError {}

impl From<CacheError> for EditorError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

impl From<StoreError> for EditorError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Applies add/remove actions coming from list editors. Lists are keyed
/// by their base category id (`None` keys the root list). Without a
/// target entity actions operate on categories themselves; with one they
/// operate on the entity's ties.
pub struct CategoryEditor<'a> {
    catalog: &'a Catalog,
    lists: Vec<CategoryList>,
}

impl<'a> CategoryEditor<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            lists: Vec::new(),
        }
    }

    pub fn register(&mut self, mut list: CategoryList, rules: EditorRules) {
        list.enable_editor(rules);
        self.lists.push(list);
    }

    pub fn lists(&self) -> &[CategoryList] {
        &self.lists
    }

    /// Returns the affected category for `Add`, `None` for `Remove`.
    pub fn handle(
        &self,
        list_id: Option<i64>,
        action: &CategoryAction,
        actor: &str,
    ) -> Result<Option<Category>, EditorError> {
        let list = self
            .lists
            .iter()
            .find(|list| list.id() == list_id)
            .ok_or(EditorError::UnknownList)?;
        let rules = list.rules().cloned().ok_or(EditorError::EditorDisabled)?;

        match action {
            CategoryAction::Add { title } => {
                self.action_add(list, &rules, title, actor).map(Some)
            }
            CategoryAction::Remove { category_id } => {
                self.action_remove(list, &rules, *category_id)?;
                Ok(None)
            }
        }
    }

    fn action_add(
        &self,
        list: &CategoryList,
        rules: &EditorRules,
        title: &str,
        actor: &str,
    ) -> Result<Category, EditorError> {
        if !rules.allow_add {
            return Err(EditorError::ActionNotAllowed {
                action: "add",
                list_title: list.title().to_string(),
            });
        }

        let title = title.trim();
        if title.is_empty() {
            return Err(EditorError::EmptyTitle);
        }

        let existing = self.catalog.find_category(list.parent(), title)?;
        if let Some(existing) = &existing {
            if list.target().is_none() {
                // Nothing to do: the category is already there.
                return Ok(existing.clone());
            }
        }
        if existing.is_none() && !rules.allow_new {
            return Err(EditorError::NewCategoriesForbidden {
                title: title.to_string(),
                list_title: list.title().to_string(),
            });
        }

        let child_ids = self.catalog.child_ids(list.parent())?;

        let category = match existing {
            Some(category) => category,
            None => {
                if list.target().is_none() {
                    check_max(rules, child_ids.len(), list)?;
                }
                self.catalog.category_add(title, actor, list.id())?
            }
        };

        if let Some(entity) = list.target() {
            let num = self.catalog.ties_count_for(&child_ids, entity)?;
            check_max(rules, num, list)?;
            self.catalog.tag(entity, category.id, actor)?;
        }

        Ok(category)
    }

    fn action_remove(
        &self,
        list: &CategoryList,
        rules: &EditorRules,
        category_id: i64,
    ) -> Result<(), EditorError> {
        if !rules.allow_remove {
            return Err(EditorError::ActionNotAllowed {
                action: "remove",
                list_title: list.title().to_string(),
            });
        }
        if category_id <= 0 {
            return Err(EditorError::UnknownCategory(category_id));
        }

        let category = self
            .catalog
            .category_by_id(category_id)?
            .ok_or(EditorError::UnknownCategory(category_id))?;

        if category.is_locked {
            return Err(EditorError::LockedCategory {
                ident: category.ident(),
            });
        }
        if category.parent_id != list.id() {
            return Err(EditorError::NotInList {
                ident: category.ident(),
                list_title: list.title().to_string(),
            });
        }

        let child_ids = self.catalog.child_ids(list.parent())?;
        check_min(rules, child_ids.len(), list)?;

        match list.target() {
            None => {
                self.catalog.category_delete(category.id)?;
            }
            Some(entity) => {
                let num = self.catalog.ties_count_for(&child_ids, entity)?;
                check_min(rules, num, list)?;
                self.catalog.untag(entity, category.id)?;
            }
        }

        Ok(())
    }
}

fn check_min(rules: &EditorRules, num: usize, list: &CategoryList) -> Result<(), EditorError> {
    if let Some(min) = rules.min_num {
        if num.saturating_sub(1) < min {
            return Err(EditorError::MinNumReached {
                min,
                list_title: list.title().to_string(),
            });
        }
    }
    Ok(())
}

fn check_max(rules: &EditorRules, num: usize, list: &CategoryList) -> Result<(), EditorError> {
    if let Some(max) = rules.max_num {
        if num + 1 > max {
            return Err(EditorError::MaxNumReached {
                max,
                list_title: list.title().to_string(),
            });
        }
    }
    Ok(())
}
