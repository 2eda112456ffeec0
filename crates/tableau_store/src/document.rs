//! The persisted document and its parts.
//!
//! A [`Document`] maps each [`Category`] to an ordered list of [`Item`]s.
//! Items are opaque JSON objects: the store never looks inside them except
//! for the optional `image` field and for structural equality on delete.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;

/// One of the fixed top-level lists of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Messages from the chief.
    ChiefMessages,
    /// Messages from the amicalist association.
    AmicalistMessages,
    /// Recruit announcements.
    Recruits,
    /// Upcoming events.
    Events,
}

impl Category {
    /// All categories, in document order.
    pub const ALL: [Category; 4] = [
        Category::ChiefMessages,
        Category::AmicalistMessages,
        Category::Recruits,
        Category::Events,
    ];

    /// Returns the wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::ChiefMessages => "chiefMessages",
            Category::AmicalistMessages => "amicalistMessages",
            Category::Recruits => "recruits",
            Category::Events => "events",
        }
    }

    /// Returns true for the two message boards.
    #[must_use]
    pub const fn is_message_board(self) -> bool {
        matches!(self, Category::ChiefMessages | Category::AmicalistMessages)
    }
}

impl FromStr for Category {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| StoreError::InvalidCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single record: an arbitrary JSON object.
///
/// Equality is structural. Two items are equal when they have the same keys
/// mapped to equal values, whatever the key order. Numbers compare by value,
/// so `10` and `10.0` match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        objects_equal(&self.0, &other.0)
    }
}

impl Item {
    /// Name of the field that may reference an uploaded file.
    pub const IMAGE_FIELD: &'static str = "image";

    /// Wraps a JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Converts a JSON value into an item, if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Returns the value of `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns the relative path in the `image` field, if any.
    pub fn image(&self) -> Option<&str> {
        self.get_str(Self::IMAGE_FIELD).filter(|path| !path.is_empty())
    }

    /// Returns true if the item has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the item, returning it as a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Item {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

fn objects_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| values_equal(value, other)))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => objects_equal(x, y),
        _ => a == b,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }

    let (text_a, text_b) = (a.to_string(), b.to_string());
    if text_a == text_b {
        return true;
    }
    // integers too wide for 64 bits only match digit for digit
    if is_integer_literal(&text_a) && is_integer_literal(&text_b) {
        return false;
    }
    matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
}

fn is_integer_literal(text: &str) -> bool {
    !text.contains(['.', 'e', 'E'])
}

/// The whole persisted document.
///
/// All four categories are always written, even when empty. Top-level keys
/// that are not categories are kept as-is so a rewrite never drops data that
/// another tool put in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    chief_messages: Vec<Item>,
    #[serde(default)]
    amicalist_messages: Vec<Item>,
    #[serde(default)]
    recruits: Vec<Item>,
    #[serde(default)]
    events: Vec<Item>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Document {
    /// Creates a document with all categories empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a document from its JSON bytes.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Serializes the document as 2-space indented UTF-8 JSON.
    ///
    /// Non-ASCII text is written as-is, not escaped.
    pub fn to_pretty_json(&self) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Returns the items of a category, in insertion order.
    #[must_use]
    pub fn items(&self, category: Category) -> &[Item] {
        match category {
            Category::ChiefMessages => &self.chief_messages,
            Category::AmicalistMessages => &self.amicalist_messages,
            Category::Recruits => &self.recruits,
            Category::Events => &self.events,
        }
    }

    fn items_mut(&mut self, category: Category) -> &mut Vec<Item> {
        match category {
            Category::ChiefMessages => &mut self.chief_messages,
            Category::AmicalistMessages => &mut self.amicalist_messages,
            Category::Recruits => &mut self.recruits,
            Category::Events => &mut self.events,
        }
    }

    /// Appends an item at the end of a category.
    pub fn push(&mut self, category: Category, item: Item) {
        self.items_mut(category).push(item);
    }

    /// Removes the first item of `category` equal to `item`.
    ///
    /// Only one occurrence is removed; later duplicates stay in place.
    pub fn remove_first(&mut self, category: Category, item: &Item) -> Option<Item> {
        let items = self.items_mut(category);
        let index = items.iter().position(|candidate| candidate == item)?;
        Some(items.remove(index))
    }

    /// Returns the number of items across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        Category::ALL
            .into_iter()
            .map(|category| self.items(category).len())
            .sum()
    }

    /// Returns true if no category holds an item.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns top-level keys that are not categories.
    pub fn extra_keys(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> Item {
        Item::from_value(value).unwrap()
    }

    #[test]
    fn category_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn unknown_category_rejected() {
        let result = "flashNews".parse::<Category>();
        assert!(matches!(result, Err(StoreError::InvalidCategory(name)) if name == "flashNews"));
        assert!("Events".parse::<Category>().is_err());
        assert!("".parse::<Category>().is_err());
    }

    #[test]
    fn empty_document_has_all_categories() {
        let json: Value = serde_json::from_slice(&Document::new().to_pretty_json().unwrap()).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["chiefMessages", "amicalistMessages", "recruits", "events"]
        );
    }

    #[test]
    fn pretty_json_format() {
        let mut doc = Document::new();
        doc.push(Category::Events, item(json!({"title": "Fête de la Sainte-Barbe"})));

        let text = String::from_utf8(doc.to_pretty_json().unwrap()).unwrap();
        assert!(text.starts_with("{\n  \"chiefMessages\": [],\n"));
        assert!(text.contains("\"title\": \"Fête de la Sainte-Barbe\""));
        assert!(!text.contains("\\u00ea"));
    }

    #[test]
    fn missing_categories_default_to_empty() {
        let doc = Document::from_json(br#"{"events": [{"title": "A"}]}"#).unwrap();
        assert_eq!(doc.items(Category::Events).len(), 1);
        assert!(doc.items(Category::Recruits).is_empty());
    }

    #[test]
    fn extra_keys_preserved() {
        let doc = Document::from_json(br#"{"events": [], "flashNews": [{"text": "x"}]}"#).unwrap();
        assert_eq!(doc.extra_keys().collect::<Vec<_>>(), vec!["flashNews"]);

        let reparsed: Value = serde_json::from_slice(&doc.to_pretty_json().unwrap()).unwrap();
        assert_eq!(reparsed["flashNews"], json!([{"text": "x"}]));
        assert_eq!(reparsed["chiefMessages"], json!([]));
    }

    #[test]
    fn item_equality_ignores_key_order() {
        let a = item(json!({"title": "A", "date": "2024-05-01"}));
        let b: Item = serde_json::from_str(r#"{"date": "2024-05-01", "title": "A"}"#).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, item(json!({"title": "A"})));
    }

    #[test]
    fn item_equality_compares_numbers_by_value() {
        let stored: Item = serde_json::from_str(r#"{"title": "A", "places": 10.0}"#).unwrap();
        assert_eq!(stored, item(json!({"places": 10, "title": "A"})));
        assert_ne!(stored, item(json!({"title": "A", "places": 10.5})));
        assert_ne!(stored, item(json!({"title": "A", "places": "10"})));

        let nested: Item =
            serde_json::from_str(r#"{"slots": [1.0, {"n": -2.00}], "big": 1e2}"#).unwrap();
        assert_eq!(nested, item(json!({"big": 100, "slots": [1, {"n": -2}]})));
        assert_ne!(nested, item(json!({"big": 100, "slots": [1, {"n": 2}]})));
    }

    #[test]
    fn wide_integers_compare_exactly() {
        let a: Item = serde_json::from_str(r#"{"id": 123456789012345678901234567890}"#).unwrap();
        let same: Item = serde_json::from_str(r#"{"id": 123456789012345678901234567890}"#).unwrap();
        let close: Item = serde_json::from_str(r#"{"id": 123456789012345678901234567891}"#).unwrap();
        assert_eq!(a, same);
        assert_ne!(a, close);
    }

    #[test]
    fn wide_integers_survive_a_rewrite() {
        let mut doc = Document::from_json(
            br#"{"recruits": [{"id": 123456789012345678901234567890, "ratio": 0.1}]}"#,
        )
        .unwrap();
        doc.push(Category::Events, item(json!({"title": "B"})));

        let text = String::from_utf8(doc.to_pretty_json().unwrap()).unwrap();
        assert!(text.contains("\"id\": 123456789012345678901234567890"), "{text}");
        assert!(text.contains("\"ratio\": 0.1"), "{text}");
    }

    #[test]
    fn remove_first_only_removes_one() {
        let mut doc = Document::new();
        let dup = item(json!({"title": "dup"}));
        doc.push(Category::Events, dup.clone());
        doc.push(Category::Events, item(json!({"title": "other"})));
        doc.push(Category::Events, dup.clone());

        assert_eq!(doc.remove_first(Category::Events, &dup), Some(dup.clone()));
        assert_eq!(
            doc.items(Category::Events),
            &[item(json!({"title": "other"})), dup]
        );
    }

    #[test]
    fn remove_first_missing() {
        let mut doc = Document::new();
        doc.push(Category::Events, item(json!({"title": "A"})));
        assert!(doc
            .remove_first(Category::Recruits, &item(json!({"title": "A"})))
            .is_none());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn image_field() {
        assert_eq!(
            item(json!({"image": "assets/images/a.png"})).image(),
            Some("assets/images/a.png")
        );
        assert_eq!(item(json!({"image": ""})).image(), None);
        assert_eq!(item(json!({"image": 3})).image(), None);
        assert_eq!(item(json!({})).image(), None);
    }

    #[test]
    fn from_value_requires_object() {
        assert!(Item::from_value(json!([1, 2])).is_none());
        assert!(Item::from_value(json!("text")).is_none());
        assert!(Item::from_value(json!({})).unwrap().is_empty());
    }
}
