#![forbid(unsafe_code)]

use crate::catalog::Catalog;
use crate::editor::EditorRules;
use crate::error::CacheError;
use tt_core::entity::EntityRef;
use tt_core::model::{Category, Parent, TieScope};

const ROOT_LIST_TITLE: &str = "Categories";

/// A list entry: the category plus its tie count when the list was built
/// against a target entity. Plain listings leave the count unset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListItem {
    pub category: Category,
    pub ties_num: Option<u64>,
}

/// A materialized view over one parent bucket: the resolved base category
/// (absent for the root bucket or an unknown alias), the child items, an
/// optional target entity and optional editor rules.
#[derive(Clone, Debug)]
pub struct CategoryList {
    parent: Parent,
    base: Option<Category>,
    target: Option<EntityRef>,
    rules: Option<EditorRules>,
    items: Vec<ListItem>,
}

impl CategoryList {
    pub fn parent(&self) -> &Parent {
        &self.parent
    }

    pub fn base(&self) -> Option<&Category> {
        self.base.as_ref()
    }

    pub fn target(&self) -> Option<&EntityRef> {
        self.target.as_ref()
    }

    pub fn rules(&self) -> Option<&EditorRules> {
        self.rules.as_ref()
    }

    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    /// Id of the base category; `None` for the root bucket.
    pub fn id(&self) -> Option<i64> {
        self.base.as_ref().map(|category| category.id)
    }

    pub fn title(&self) -> &str {
        match &self.base {
            Some(category) => &category.title,
            None => ROOT_LIST_TITLE,
        }
    }

    pub fn note(&self) -> &str {
        match &self.base {
            Some(category) => &category.note,
            None => "",
        }
    }

    pub fn enable_editor(&mut self, rules: EditorRules) {
        self.rules = Some(rules);
    }
}

impl Catalog {
    /// Builds the list for one parent bucket. With a target entity the
    /// items carry tie counts and children without ties are dropped;
    /// without one, every child is listed unannotated.
    pub fn category_list(
        &self,
        parent: Parent,
        target: Option<&EntityRef>,
    ) -> Result<CategoryList, CacheError> {
        let base = match parent.as_alias() {
            Some(alias) => self.category_by_alias(alias)?,
            None => None,
        };

        let items = match target {
            Some(entity) => self
                .tied_children_for(&parent, &TieScope::Entity(entity.clone()))?
                .into_iter()
                .map(|tied| ListItem {
                    category: tied.category,
                    ties_num: Some(tied.ties_num),
                })
                .collect(),
            None => self
                .children_for(&parent, false)?
                .into_iter()
                .map(|category| ListItem {
                    category,
                    ties_num: None,
                })
                .collect(),
        };

        Ok(CategoryList {
            parent,
            base,
            target: target.cloned(),
            rules: None,
            items,
        })
    }

    /// Lists for every parent bucket relevant to the entity: the parents
    /// of the categories it is tied to, plus any explicitly requested
    /// extras, in the cache's bucket order.
    pub fn category_lists_for(
        &self,
        entity: &EntityRef,
        extra_parents: &[Parent],
    ) -> Result<Vec<CategoryList>, CacheError> {
        let tie_ids = self.tie_category_ids_for(entity)?;
        let mut parents = self.parents_for(&tie_ids)?;
        for parent in extra_parents {
            parents.insert(parent.clone());
        }

        let collected: Vec<Parent> = parents.into_iter().collect();
        let ordered = self.sort_aliases(&collected)?;

        let mut lists = Vec::with_capacity(ordered.len());
        for parent in ordered {
            lists.push(self.category_list(parent, Some(entity))?);
        }
        Ok(lists)
    }

    /// Aliases of the direct children that have one.
    pub fn category_aliases_under(&self, parent: &Parent) -> Result<Vec<String>, CacheError> {
        let children = self.children_for(parent, true)?;
        Ok(children
            .into_iter()
            .filter_map(|category| category.alias)
            .collect())
    }
}
