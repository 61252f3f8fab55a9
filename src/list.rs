//! List items, filter sets, and the list-record collaborator
//!
//! A [`ListItem`] is one UI-facing entry of a searchable list, derived from
//! (possibly one of several produced from) a document. A [`ListRecord`] is
//! the remote entity that owns the collection being edited; it expands
//! documents into items, scopes the item query, and performs the remote
//! remove/move mutations. [`FilterSet`] converts filter input into a query
//! body and carries the list scope.

use crate::document::Document;
use crate::editor::options::EditOption;
use crate::error::Result;
use crate::types::{DocumentId, IndexSet, ItemKey};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::cmp::Ordering;

/// One entry of a searchable list
///
/// Identity is the surrogate [`ItemKey`], not the logical [`DocumentId`]:
/// a document may expand into several items sharing the same id. Equality
/// compares keys only, so a clone still denotes the same logical entry.
#[derive(Clone, Debug)]
pub struct ListItem<D: Document> {
    key: ItemKey,
    /// Logical id of the document this item was created from
    pub id: DocumentId,
    /// The source document, when the item carries one
    pub document: Option<D>,
    /// Item-level attributes (e.g., position, duration) used for local sort
    pub attributes: Map<String, Value>,
}

impl<D: Document> ListItem<D> {
    /// Create an item with a bare document id
    pub fn new(id: DocumentId) -> Self {
        Self {
            key: ItemKey::next(),
            id,
            document: None,
            attributes: Map::new(),
        }
    }

    /// Create an item from a fetched document
    pub fn from_document(document: D) -> Self {
        let id = document
            .id()
            .map(DocumentId::new)
            .unwrap_or(DocumentId::UNKNOWN);
        Self {
            key: ItemKey::next(),
            id,
            document: Some(document),
            attributes: Map::new(),
        }
    }

    /// The item's surrogate identity
    pub fn key(&self) -> ItemKey {
        self.key
    }

    /// Read one attribute
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Set one attribute, returning the item (builder style)
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// The document's display name, when available
    pub fn display_name(&self) -> Option<String> {
        self.document.as_ref().and_then(|doc| doc.display_name())
    }
}

impl<D: Document> PartialEq for ListItem<D> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<D: Document> Eq for ListItem<D> {}

/// Filter input convertible into a query body
///
/// Implementations collect filter clauses and render the session query.
/// The list scope is the parent list's own item condition, attached before a
/// fetch cycle starts; a scoped fetch is one restricted to a single list's
/// items, which is what makes structural edits (remove/move) meaningful.
pub trait FilterSet: Send + Sync {
    /// Render the query body for a fetch session
    fn to_query(&self) -> Value;

    /// Attach or clear the parent list's item condition
    fn set_list_scope(&mut self, scope: Option<Value>);

    /// Whether the fetch is scoped to a single list's items
    fn is_list_scoped(&self) -> bool;

    /// Clone into a boxed trait object
    fn clone_box(&self) -> Box<dyn FilterSet>;
}

impl Clone for Box<dyn FilterSet> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Straightforward [`FilterSet`] over a list of `bool/must` clauses
#[derive(Clone, Debug, Default)]
pub struct BasicFilterSet {
    conditions: Vec<Value>,
    list_scope: Option<Value>,
}

impl BasicFilterSet {
    /// Create an empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause when one was built (builder style)
    pub fn with_condition(mut self, condition: Option<Value>) -> Self {
        if let Some(condition) = condition {
            self.conditions.push(condition);
        }
        self
    }
}

impl FilterSet for BasicFilterSet {
    fn to_query(&self) -> Value {
        let mut must = self.conditions.clone();
        if let Some(scope) = &self.list_scope {
            must.push(scope.clone());
        }
        json!({ "query": { "bool": { "must": must } } })
    }

    fn set_list_scope(&mut self, scope: Option<Value>) {
        self.list_scope = scope;
    }

    fn is_list_scoped(&self) -> bool {
        self.list_scope.is_some()
    }

    fn clone_box(&self) -> Box<dyn FilterSet> {
        Box::new(self.clone())
    }
}

/// The remote record that owns the collection being edited
///
/// Remote mutations (`remove_items`, `move_items`) receive the items being
/// edited plus the current ordered item list and return the new list; the
/// mutated record itself is written back through `&mut self`, so the editor
/// can propagate it to its live fetcher. [`remove_from`] and [`move_within`]
/// implement the in-memory list math most implementations will delegate to.
#[async_trait]
pub trait ListRecord<D: Document>: Document {
    /// Whether the editor must materialize every document before editing
    fn requires_all_documents(&self) -> bool {
        false
    }

    /// Number of items in the list, when known before fetching
    fn item_count(&self) -> Option<usize> {
        None
    }

    /// Sort keys that must be applied client-side
    fn keys_requiring_local_sort(&self) -> Vec<String> {
        Vec::new()
    }

    /// Expand one fetched document into zero or more list items
    fn create_list_items(&self, document: &D) -> Vec<ListItem<D>>;

    /// Query condition restricting a search to this list's items
    fn item_query_condition(&self) -> Option<Value>;

    /// Whether the selection may be removed from the list
    fn can_remove_items(&self, _items: &[ListItem<D>]) -> bool {
        false
    }

    /// Whether the selection may be moved within the list
    fn can_move_items(&self, _items: &[ListItem<D>]) -> bool {
        true
    }

    /// Remove the items remotely and return the new item list
    async fn remove_items(
        &mut self,
        items: &[ListItem<D>],
        current: &[ListItem<D>],
    ) -> Result<Vec<ListItem<D>>>;

    /// Move the items remotely and return the new item list
    async fn move_items(
        &mut self,
        items: &[ListItem<D>],
        position: usize,
        current: &[ListItem<D>],
    ) -> Result<Vec<ListItem<D>>>;

    /// List-specific edit options for a selection
    fn custom_edit_options(
        &self,
        _selection: &[ListItem<D>],
        _current: &[ListItem<D>],
    ) -> Vec<EditOption<Self, D>>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Whether a sort key must be applied client-side
    fn local_sort_required(&self, field: &str) -> bool {
        self.keys_requiring_local_sort()
            .iter()
            .any(|key| key == field)
    }

    /// Sort items by an integer attribute
    ///
    /// The sort is stable; items missing the attribute keep their relative
    /// order and collect after the items that carry it.
    fn sorted_items(
        &self,
        items: &[ListItem<D>],
        key: &str,
        ascending: bool,
    ) -> Vec<ListItem<D>> {
        let mut sorted = items.to_vec();
        sorted.sort_by(|left, right| {
            let left_value = left.attribute(key).and_then(Value::as_i64);
            let right_value = right.attribute(key).and_then(Value::as_i64);
            match (left_value, right_value) {
                (Some(left_value), Some(right_value)) => {
                    if ascending {
                        left_value.cmp(&right_value)
                    } else {
                        right_value.cmp(&left_value)
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        sorted
    }

    /// Title for a selection, used by edit options
    ///
    /// One item with a display name is quoted; otherwise the count and type
    /// name, pluralized.
    fn title_for_items(&self, items: &[ListItem<D>]) -> String {
        if items.len() == 1
            && let Some(name) = items[0].display_name()
        {
            return format!("\"{name}\"");
        }

        let mut title = format!("{} {}", items.len(), D::type_name());
        if items.len() > 1 {
            title.push('s');
        }
        title
    }
}

/// Positions of `items` within `list`, by surrogate-key identity
pub fn index_set_of<D: Document>(items: &[ListItem<D>], list: &[ListItem<D>]) -> IndexSet {
    items
        .iter()
        .filter_map(|item| list.iter().position(|candidate| candidate == item))
        .collect()
}

/// `original` with `targets` removed, preserving the order of the rest
pub fn remove_from<D: Document>(
    original: &[ListItem<D>],
    targets: &[ListItem<D>],
) -> Vec<ListItem<D>> {
    original
        .iter()
        .filter(|item| !targets.contains(*item))
        .cloned()
        .collect()
}

/// `original` with `targets` relocated to start at `position`
///
/// Targets keep their relative order; the position is clamped to the length
/// of the list after the targets are pulled out.
pub fn move_within<D: Document>(
    original: &[ListItem<D>],
    targets: &[ListItem<D>],
    position: usize,
) -> Vec<ListItem<D>> {
    let mut remaining = remove_from(original, targets);
    let moving: Vec<ListItem<D>> = original
        .iter()
        .filter(|item| targets.contains(*item))
        .cloned()
        .collect();

    let at = position.min(remaining.len());
    remaining.splice(at..at, moving);
    remaining
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PlaylistDoc, TrackDoc, track_item};

    fn items(names: &[&str]) -> Vec<ListItem<TrackDoc>> {
        names
            .iter()
            .enumerate()
            .map(|(id, name)| track_item(id as i64 + 1, name))
            .collect()
    }

    #[test]
    fn item_identity_is_the_surrogate_key() {
        let doc = TrackDoc {
            id: 1,
            name: "same".into(),
            duration: None,
        };
        let first = ListItem::from_document(doc.clone());
        let second = ListItem::from_document(doc);

        assert_eq!(first.id, second.id, "both items share the logical id");
        assert_ne!(first, second, "items from the same document stay distinct");
        assert_eq!(first, first.clone(), "a clone denotes the same entry");
    }

    #[test]
    fn from_document_without_id_uses_unknown() {
        let item = ListItem::from_document(TrackDoc {
            id: -1,
            name: "n".into(),
            duration: None,
        });
        assert_eq!(item.id, DocumentId::UNKNOWN);
    }

    #[test]
    fn basic_filter_set_renders_scope_and_conditions() {
        let mut filters = BasicFilterSet::new()
            .with_condition(Some(json!({ "term": { "status": "ready" } })))
            .with_condition(None);
        assert!(!filters.is_list_scoped());

        filters.set_list_scope(Some(json!({ "terms": { "id": [1, 2] } })));
        assert!(filters.is_list_scoped());

        let query = filters.to_query();
        let must = query["query"]["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(must[1], json!({ "terms": { "id": [1, 2] } }));
    }

    #[test]
    fn remove_from_preserves_order_of_remaining() {
        let all = items(&["a", "b", "c", "d"]);
        let removed = remove_from(&all, &[all[1].clone(), all[3].clone()]);

        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0], all[0]);
        assert_eq!(removed[1], all[2]);
    }

    #[test]
    fn move_within_relocates_and_clamps() {
        let all = items(&["a", "b", "c", "d"]);

        let moved = move_within(&all, &[all[0].clone()], 2);
        assert_eq!(moved, vec![all[1].clone(), all[2].clone(), all[0].clone(), all[3].clone()]);

        let clamped = move_within(&all, &[all[0].clone(), all[1].clone()], 99);
        assert_eq!(
            clamped,
            vec![all[2].clone(), all[3].clone(), all[0].clone(), all[1].clone()]
        );
    }

    #[test]
    fn move_within_keeps_target_relative_order() {
        let all = items(&["a", "b", "c", "d"]);
        // Select out of order; relocation keeps list order of the targets.
        let moved = move_within(&all, &[all[3].clone(), all[1].clone()], 0);
        assert_eq!(
            moved,
            vec![all[1].clone(), all[3].clone(), all[0].clone(), all[2].clone()]
        );
    }

    #[test]
    fn index_set_of_resolves_positions_by_key() {
        let all = items(&["a", "b", "c"]);
        let set = index_set_of(&[all[2].clone(), all[0].clone()], &all);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn sorted_items_is_stable_and_keeps_missing_after_present() {
        let playlist = PlaylistDoc::sample(1, &[]);
        let with_10 = track_item(1, "ten").with_attribute("duration", json!(10));
        let missing_a = track_item(2, "no-a");
        let with_5 = track_item(3, "five").with_attribute("duration", json!(5));
        let missing_b = track_item(4, "no-b");

        let sorted = playlist.sorted_items(
            &[with_10.clone(), missing_a.clone(), with_5.clone(), missing_b.clone()],
            "duration",
            true,
        );
        assert_eq!(
            sorted,
            vec![with_5.clone(), with_10.clone(), missing_a.clone(), missing_b.clone()]
        );

        let descending = playlist.sorted_items(
            &[with_10.clone(), missing_a.clone(), with_5.clone(), missing_b.clone()],
            "duration",
            false,
        );
        assert_eq!(descending, vec![with_10, with_5, missing_a, missing_b]);
    }

    #[test]
    fn title_for_items_pluralizes_and_quotes() {
        let playlist = PlaylistDoc::sample(1, &[]);
        let many = items(&["a", "b"]);
        assert_eq!(playlist.title_for_items(&many), "2 tracks");

        let one = vec![track_item(1, "Sunrise")];
        assert_eq!(playlist.title_for_items(&one), "\"Sunrise\"");

        let none: Vec<ListItem<TrackDoc>> = Vec::new();
        assert_eq!(playlist.title_for_items(&none), "0 track");
    }
}
