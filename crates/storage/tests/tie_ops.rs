#![forbid(unsafe_code)]

use std::path::PathBuf;
use tt_core::entity::{EntityKind, EntityRef};
use tt_core::model::TieScope;
use tt_storage::{
    CreateCategoryRequest, CreateTieRequest, ListTiesRequest, SqliteStore, StoreError,
};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("tt_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn open_store(test_name: &str) -> SqliteStore {
    SqliteStore::open(temp_dir(test_name)).expect("open store")
}

fn entity(kind: &str, id: i64) -> EntityRef {
    EntityRef::new(EntityKind::try_new(kind).expect("entity kind"), id)
}

#[test]
fn tie_create_and_bulk_remove() {
    let mut store = open_store("tie_create_and_bulk_remove");

    let category = store
        .category_create(CreateCategoryRequest::new("Colors", "alice"))
        .expect("create category");
    let article = entity("article", 7);

    let tie = store
        .tie_create(CreateTieRequest::new(category.id, article.clone(), "alice"))
        .expect("first tie");
    assert_eq!(tie.category_id, category.id);
    assert_eq!(tie.entity_kind, "article");
    assert_eq!(tie.entity_id, 7);

    // Duplicates are allowed; removal sweeps them all.
    store
        .tie_create(CreateTieRequest::new(category.id, article.clone(), "bob"))
        .expect("second tie");

    let removed = store
        .ties_remove(category.id, &article)
        .expect("remove ties");
    assert_eq!(removed, 2);

    let removed = store
        .ties_remove(category.id, &article)
        .expect("remove again");
    assert_eq!(removed, 0);
}

#[test]
fn tie_requires_existing_category() {
    let mut store = open_store("tie_requires_existing_category");

    let err = store
        .tie_create(CreateTieRequest::new(4242, entity("article", 1), "alice"))
        .expect_err("tie to missing category must be rejected");
    assert!(matches!(err, StoreError::UnknownId));
}

#[test]
fn ties_stats_counts_per_scope() {
    let mut store = open_store("ties_stats_counts_per_scope");

    let red = store
        .category_create(CreateCategoryRequest::new("Red", "alice"))
        .expect("create red");
    let green = store
        .category_create(CreateCategoryRequest::new("Green", "alice"))
        .expect("create green");

    let article = entity("article", 1);
    let comment = entity("comment", 1);
    store
        .tie_create(CreateTieRequest::new(red.id, article.clone(), "alice"))
        .expect("tie");
    store
        .tie_create(CreateTieRequest::new(red.id, entity("article", 2), "alice"))
        .expect("tie");
    store
        .tie_create(CreateTieRequest::new(red.id, comment.clone(), "alice"))
        .expect("tie");

    let ids = vec![red.id, green.id];

    let stats = store.ties_stats(&ids, &TieScope::Any).expect("stats any");
    assert_eq!(stats.get(&red.id), Some(&3));
    // Zero-tie categories never appear.
    assert!(!stats.contains_key(&green.id));

    let articles = EntityKind::try_new("article").expect("entity kind");
    let stats = store
        .ties_stats(&ids, &TieScope::Kind(articles))
        .expect("stats kind");
    assert_eq!(stats.get(&red.id), Some(&2));

    let stats = store
        .ties_stats(&ids, &TieScope::Entity(article))
        .expect("stats entity");
    assert_eq!(stats.get(&red.id), Some(&1));

    let stats = store.ties_stats(&[], &TieScope::Any).expect("stats empty");
    assert!(stats.is_empty());
}

#[test]
fn tie_category_ids_are_distinct() {
    let mut store = open_store("tie_category_ids_are_distinct");

    let red = store
        .category_create(CreateCategoryRequest::new("Red", "alice"))
        .expect("create red");
    let green = store
        .category_create(CreateCategoryRequest::new("Green", "alice"))
        .expect("create green");

    let article = entity("article", 3);
    store
        .tie_create(CreateTieRequest::new(red.id, article.clone(), "alice"))
        .expect("tie");
    store
        .tie_create(CreateTieRequest::new(red.id, article.clone(), "bob"))
        .expect("duplicate tie");
    store
        .tie_create(CreateTieRequest::new(green.id, article.clone(), "alice"))
        .expect("tie");

    let ids = store
        .tie_category_ids_for(&article)
        .expect("category ids for entity");
    assert_eq!(ids, vec![red.id, green.id]);
}

#[test]
fn ties_list_applies_filters() {
    let mut store = open_store("ties_list_applies_filters");

    let category = store
        .category_create(CreateCategoryRequest::new("Colors", "alice"))
        .expect("create category");

    store
        .tie_create(CreateTieRequest::new(category.id, entity("article", 1), "alice"))
        .expect("tie");
    store
        .tie_create(CreateTieRequest {
            status: Some(1),
            ..CreateTieRequest::new(category.id, entity("article", 2), "bob")
        })
        .expect("tie");
    store
        .tie_create(CreateTieRequest::new(category.id, entity("comment", 3), "bob"))
        .expect("tie");

    let all = store
        .ties_list(ListTiesRequest {
            category_ids: vec![category.id],
            ..ListTiesRequest::default()
        })
        .expect("list all");
    assert_eq!(all.len(), 3);

    let by_creator = store
        .ties_list(ListTiesRequest {
            category_ids: vec![category.id],
            creator: Some("bob".to_string()),
            ..ListTiesRequest::default()
        })
        .expect("list by creator");
    assert_eq!(by_creator.len(), 2);

    let by_status = store
        .ties_list(ListTiesRequest {
            category_ids: vec![category.id],
            status: Some(1),
            ..ListTiesRequest::default()
        })
        .expect("list by status");
    assert_eq!(by_status.len(), 1);
    assert_eq!(by_status[0].entity_id, 2);

    let by_kind = store
        .ties_list(ListTiesRequest {
            category_ids: vec![category.id],
            entity_kind: Some(EntityKind::try_new("comment").expect("entity kind")),
            ..ListTiesRequest::default()
        })
        .expect("list by kind");
    assert_eq!(by_kind.len(), 1);
    assert_eq!(by_kind[0].entity_id, 3);

    let none = store
        .ties_list(ListTiesRequest::default())
        .expect("list without categories");
    assert!(none.is_empty());
}

#[test]
fn linked_entities_group_by_kind_and_category() {
    let mut store = open_store("linked_entities_group_by_kind_and_category");

    let red = store
        .category_create(CreateCategoryRequest::new("Red", "alice"))
        .expect("create red");
    let green = store
        .category_create(CreateCategoryRequest::new("Green", "alice"))
        .expect("create green");

    store
        .tie_create(CreateTieRequest::new(red.id, entity("article", 2), "alice"))
        .expect("tie");
    store
        .tie_create(CreateTieRequest::new(red.id, entity("article", 1), "alice"))
        .expect("tie");
    store
        .tie_create(CreateTieRequest::new(green.id, entity("comment", 5), "alice"))
        .expect("tie");

    let linked = store.linked_entities(None).expect("linked, all categories");
    assert_eq!(linked.get("article"), Some(&vec![1, 2]));
    assert_eq!(linked.get("comment"), Some(&vec![5]));

    let linked = store
        .linked_entities(Some(&[red.id]))
        .expect("linked, red only");
    assert_eq!(linked.get("article"), Some(&vec![1, 2]));
    assert!(!linked.contains_key("comment"));

    let linked = store.linked_entities(Some(&[])).expect("linked, no ids");
    assert!(linked.is_empty());

    let by_category = store
        .linked_entities_by_category()
        .expect("linked by category");
    assert_eq!(
        by_category
            .get(&red.id)
            .and_then(|kinds| kinds.get("article")),
        Some(&vec![1, 2])
    );
    assert_eq!(
        by_category
            .get(&green.id)
            .and_then(|kinds| kinds.get("comment")),
        Some(&vec![5])
    );
}

#[test]
fn ties_count_for_entity_within_categories() {
    let mut store = open_store("ties_count_for_entity_within_categories");

    let red = store
        .category_create(CreateCategoryRequest::new("Red", "alice"))
        .expect("create red");
    let green = store
        .category_create(CreateCategoryRequest::new("Green", "alice"))
        .expect("create green");

    let article = entity("article", 9);
    store
        .tie_create(CreateTieRequest::new(red.id, article.clone(), "alice"))
        .expect("tie");
    store
        .tie_create(CreateTieRequest::new(green.id, article.clone(), "alice"))
        .expect("tie");
    store
        .tie_create(CreateTieRequest::new(green.id, entity("article", 10), "alice"))
        .expect("other entity tie");

    let count = store
        .ties_count_for(&[red.id, green.id], &article)
        .expect("count");
    assert_eq!(count, 2);

    let count = store.ties_count_for(&[red.id], &article).expect("count");
    assert_eq!(count, 1);

    let count = store.ties_count_for(&[], &article).expect("count empty");
    assert_eq!(count, 0);
}

#[test]
fn category_delete_cascades_to_ties() {
    let mut store = open_store("category_delete_cascades_to_ties");

    let category = store
        .category_create(CreateCategoryRequest::new("Colors", "alice"))
        .expect("create category");
    let article = entity("article", 1);
    store
        .tie_create(CreateTieRequest::new(category.id, article.clone(), "alice"))
        .expect("tie");

    store.category_delete(category.id).expect("delete category");

    let ids = store
        .tie_category_ids_for(&article)
        .expect("category ids for entity");
    assert!(ids.is_empty());
}
