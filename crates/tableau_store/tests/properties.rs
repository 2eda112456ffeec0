//! Property tests for append/delete semantics.

use proptest::prelude::*;
use serde_json::json;
use tableau_store::{Category, DocumentStore, Item, SiteLayout, StoreError};
use tempfile::tempdir;

fn category_strategy() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

/// Small value space so duplicates are common.
fn item_strategy() -> impl Strategy<Value = Item> {
    (0u8..4, prop::option::of("[a-c]{1,2}")).prop_map(|(n, tag)| {
        let mut value = json!({"n": n});
        if let Some(tag) = tag {
            value["tag"] = json!(tag);
        }
        Item::from_value(value).unwrap()
    })
}

#[derive(Debug, Clone)]
enum Op {
    Append(Category, Item),
    Delete(Category, Item),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (category_strategy(), item_strategy()).prop_map(|(c, i)| Op::Append(c, i)),
        (category_strategy(), item_strategy()).prop_map(|(c, i)| Op::Delete(c, i)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// The store behaves like four plain vectors with first-match removal.
    #[test]
    fn store_matches_vector_model(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let temp = tempdir().unwrap();
        let store = DocumentStore::open(SiteLayout::new(temp.path())).unwrap();
        let mut model: [Vec<Item>; 4] = Default::default();
        let mut created = false;

        let slot = |c: Category| Category::ALL.iter().position(|x| *x == c).unwrap();

        for op in ops {
            match op {
                Op::Append(category, item) => {
                    store.append(category.as_str(), item.clone()).unwrap();
                    model[slot(category)].push(item);
                    created = true;
                }
                Op::Delete(category, item) => {
                    let result = store.delete(category.as_str(), &item);
                    let items = &mut model[slot(category)];
                    if !created {
                        prop_assert!(matches!(result, Err(StoreError::DocumentMissing)));
                    } else if let Some(index) = items.iter().position(|x| *x == item) {
                        prop_assert!(result.is_ok());
                        items.remove(index);
                    } else {
                        let is_not_found = matches!(result, Err(StoreError::ItemNotFound { .. }));
                        prop_assert!(is_not_found);
                    }
                }
            }
        }

        if created {
            let doc = store.load().unwrap();
            for category in Category::ALL {
                prop_assert_eq!(doc.items(category), model[slot(category)].as_slice());
            }
        }
    }

    /// Deleting an item and saving it again keeps every other item in place.
    #[test]
    fn delete_then_resave_restores_contents(
        items in prop::collection::vec(item_strategy(), 1..12),
        pick in any::<prop::sample::Index>(),
    ) {
        let temp = tempdir().unwrap();
        let store = DocumentStore::open(SiteLayout::new(temp.path())).unwrap();
        for item in &items {
            store.append("events", item.clone()).unwrap();
        }
        let target = items[pick.index(items.len())].clone();

        store.delete("events", &target).unwrap();
        store.append("events", target.clone()).unwrap();

        let after = store.load().unwrap();
        let after = after.items(Category::Events);
        prop_assert_eq!(after.len(), items.len());
        prop_assert_eq!(after.last(), Some(&target));

        // Untouched items keep their insertion order.
        let first = items.iter().position(|x| *x == target).unwrap();
        let mut expected = items.clone();
        expected.remove(first);
        expected.push(target);
        prop_assert_eq!(after, expected.as_slice());
    }

    /// Unknown categories never write.
    #[test]
    fn unknown_category_never_writes(name in "[a-zA-Z]{1,16}") {
        prop_assume!(name.parse::<Category>().is_err());
        let temp = tempdir().unwrap();
        let store = DocumentStore::open(SiteLayout::new(temp.path())).unwrap();

        let result = store.append(&name, Item::from_value(json!({"x": 1})).unwrap());
        let is_invalid = matches!(result, Err(StoreError::InvalidCategory(_)));
        prop_assert!(is_invalid);
        prop_assert!(!store.layout().document_path().exists());
    }
}

#[test]
fn invalid_category_keeps_mtime() {
    let temp = tempdir().unwrap();
    let store = DocumentStore::open(SiteLayout::new(temp.path())).unwrap();
    store
        .append("events", Item::from_value(json!({"title": "A"})).unwrap())
        .unwrap();
    let before = store.clock().modified_at().unwrap();
    let bytes = std::fs::read(store.layout().document_path()).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(20));
    let result = store.append("news", Item::from_value(json!({"title": "B"})).unwrap());

    assert!(matches!(result, Err(StoreError::InvalidCategory(_))));
    assert_eq!(store.clock().modified_at().unwrap(), before);
    assert_eq!(std::fs::read(store.layout().document_path()).unwrap(), bytes);
}
