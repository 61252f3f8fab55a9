//! Shared fixtures for unit tests: a scripted backend and sample types

use crate::backend::SearchBackend;
use crate::document::Document;
use crate::editor::options::{CustomEditAction, CustomEditOutcome, EditAction, EditOption};
use crate::error::{Error, Result};
use crate::list::{ListItem, ListRecord, move_within, remove_from};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::ops::RangeInclusive;
use std::sync::Mutex;

/// Scripted in-memory [`SearchBackend`]
///
/// Search responses are consumed from a queue in push order; document
/// sources are looked up by (type name, id). Every request is logged for
/// assertions.
#[derive(Default)]
pub(crate) struct MockBackend {
    pages: Mutex<VecDeque<Result<Value>>>,
    sources: Mutex<HashMap<(String, i64), Value>>,
    search_log: Mutex<Vec<Value>>,
    source_log: Mutex<Vec<(String, String, i64)>>,
    update_log: Mutex<Vec<(String, i64, Value)>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a search page with the given reported total and documents
    pub(crate) fn push_page(&self, total: Option<u64>, documents: &[Value]) {
        let hits: Vec<Value> = documents
            .iter()
            .map(|source| json!({ "_source": source }))
            .collect();
        let mut hits_section = json!({ "hits": hits });
        if let Some(total) = total {
            hits_section["total"] = json!(total);
        }
        self.push_raw(json!({ "hits": hits_section }));
    }

    /// Queue a raw search response
    pub(crate) fn push_raw(&self, response: Value) {
        self.pages.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a search failure
    pub(crate) fn push_failure(&self, error: Error) {
        self.pages.lock().unwrap().push_back(Err(error));
    }

    /// Provide a document source for fetch-by-id
    pub(crate) fn set_source(&self, type_name: &str, id: i64, source: Value) {
        self.sources
            .lock()
            .unwrap()
            .insert((type_name.to_string(), id), source);
    }

    /// Every search query issued so far
    pub(crate) fn search_requests(&self) -> Vec<Value> {
        self.search_log.lock().unwrap().clone()
    }

    /// Every source fetch issued so far, as (index, type, id)
    pub(crate) fn source_requests(&self) -> Vec<(String, String, i64)> {
        self.source_log.lock().unwrap().clone()
    }

    /// Every update issued so far, as (index, id, fields)
    pub(crate) fn update_requests(&self) -> Vec<(String, i64, Value)> {
        self.update_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn search(&self, _index: &str, _type_name: &str, query: &Value) -> Result<Value> {
        self.search_log.lock().unwrap().push(query.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("no scripted search response".into())))
    }

    async fn fetch_source(&self, index: &str, type_name: &str, id: i64) -> Result<Value> {
        self.source_log
            .lock()
            .unwrap()
            .push((index.to_string(), type_name.to_string(), id));
        self.sources
            .lock()
            .unwrap()
            .get(&(type_name.to_string(), id))
            .cloned()
            .ok_or_else(|| Error::Other(format!("no scripted source for {type_name}/{id}")))
    }

    async fn update_fields(
        &self,
        index: &str,
        _type_name: &str,
        id: i64,
        fields: &Value,
    ) -> Result<Value> {
        self.update_log
            .lock()
            .unwrap()
            .push((index.to_string(), id, fields.clone()));
        Ok(json!({ "result": "updated" }))
    }
}

/// Sample document type used across the unit tests
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct TrackDoc {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub duration: Option<i64>,
}

impl Document for TrackDoc {
    fn type_name() -> &'static str {
        "track"
    }

    fn mapped_sort_field(field: &str) -> Option<&'static str> {
        match field {
            "name" => Some("name.raw"),
            _ => None,
        }
    }

    fn id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn display_name(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

/// Sample list record: a playlist of tracks, possibly with repeats
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct PlaylistDoc {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub track_ids: Vec<i64>,
    #[serde(default)]
    pub tagged_ids: Vec<i64>,
    #[serde(default)]
    pub require_all: bool,
    #[serde(default)]
    pub allow_remove: bool,
    #[serde(default)]
    pub allow_move: bool,
    #[serde(default)]
    pub fail_remove: bool,
}

impl PlaylistDoc {
    pub(crate) fn sample(id: i64, track_ids: &[i64]) -> Self {
        Self {
            id,
            name: format!("playlist-{id}"),
            track_ids: track_ids.to_vec(),
            tagged_ids: Vec::new(),
            require_all: false,
            allow_remove: true,
            allow_move: true,
            fail_remove: false,
        }
    }
}

impl Document for PlaylistDoc {
    fn type_name() -> &'static str {
        "playlist"
    }

    fn id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn display_name(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

#[async_trait]
impl ListRecord<TrackDoc> for PlaylistDoc {
    fn requires_all_documents(&self) -> bool {
        self.require_all
    }

    fn item_count(&self) -> Option<usize> {
        if self.track_ids.is_empty() {
            None
        } else {
            Some(self.track_ids.len())
        }
    }

    fn keys_requiring_local_sort(&self) -> Vec<String> {
        vec!["duration".to_string()]
    }

    fn create_list_items(&self, document: &TrackDoc) -> Vec<ListItem<TrackDoc>> {
        let occurrences = self
            .track_ids
            .iter()
            .filter(|id| **id == document.id)
            .count()
            .max(1);

        (0..occurrences)
            .map(|_| {
                let mut item = ListItem::from_document(document.clone());
                if let Some(duration) = document.duration {
                    item = item.with_attribute("duration", json!(duration));
                }
                item
            })
            .collect()
    }

    fn item_query_condition(&self) -> Option<Value> {
        if self.track_ids.is_empty() {
            None
        } else {
            Some(json!({ "terms": { "id": self.track_ids } }))
        }
    }

    fn can_remove_items(&self, _items: &[ListItem<TrackDoc>]) -> bool {
        self.allow_remove
    }

    fn can_move_items(&self, _items: &[ListItem<TrackDoc>]) -> bool {
        self.allow_move
    }

    async fn remove_items(
        &mut self,
        items: &[ListItem<TrackDoc>],
        current: &[ListItem<TrackDoc>],
    ) -> Result<Vec<ListItem<TrackDoc>>> {
        if self.fail_remove {
            return Err(Error::Other("playlist rejected the removal".into()));
        }
        for item in items {
            if let Some(position) = self
                .track_ids
                .iter()
                .position(|id| *id == item.id.get())
            {
                self.track_ids.remove(position);
            }
        }
        Ok(remove_from(current, items))
    }

    async fn move_items(
        &mut self,
        items: &[ListItem<TrackDoc>],
        position: usize,
        current: &[ListItem<TrackDoc>],
    ) -> Result<Vec<ListItem<TrackDoc>>> {
        let new_items = move_within(current, items, position);
        self.track_ids = new_items.iter().map(|item| item.id.get()).collect();
        Ok(new_items)
    }

    fn custom_edit_options(
        &self,
        selection: &[ListItem<TrackDoc>],
        _current: &[ListItem<TrackDoc>],
    ) -> Vec<EditOption<Self, TrackDoc>> {
        if selection.is_empty() {
            return Vec::new();
        }
        vec![EditOption::new(
            format!("Tag {}", self.title_for_items(selection)),
            false,
            true,
            EditAction::Custom {
                items: selection.to_vec(),
                action: Box::new(TagTracksAction),
            },
        )]
    }
}

/// Custom edit action: records the selection's ids on the playlist
pub(crate) struct TagTracksAction;

#[async_trait]
impl CustomEditAction<PlaylistDoc, TrackDoc> for TagTracksAction {
    async fn execute(
        &mut self,
        list: &mut PlaylistDoc,
        items: &[ListItem<TrackDoc>],
    ) -> Result<CustomEditOutcome<TrackDoc>> {
        for item in items {
            list.tagged_ids.push(item.id.get());
        }
        Ok(CustomEditOutcome {
            updated_items: items.to_vec(),
        })
    }
}

/// A bare list item over a named track
pub(crate) fn track_item(id: i64, name: &str) -> ListItem<TrackDoc> {
    ListItem::from_document(TrackDoc {
        id,
        name: name.to_string(),
        duration: None,
    })
}

/// Track sources for a contiguous id range; durations descend as ids ascend
pub(crate) fn track_source(ids: RangeInclusive<i64>) -> Vec<Value> {
    ids.map(|id| {
        json!({
            "id": id,
            "name": format!("track-{id}"),
            "duration": 100 - id,
        })
    })
    .collect()
}
