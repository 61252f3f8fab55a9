//! Editor unit tests over the scripted mock backend

use super::ListEditor;
use crate::config::SearchConfig;
use crate::list::BasicFilterSet;
use crate::test_support::{MockBackend, PlaylistDoc, TrackDoc};
use crate::types::ListId;
use serde_json::{Value, json};
use std::sync::Arc;


/// An editor over the mock backend for playlist 9
fn editor_for(backend: Arc<MockBackend>) -> ListEditor<PlaylistDoc, TrackDoc> {
    ListEditor::new(
        backend,
        Arc::new(SearchConfig::default()),
        ListId::new(9),
        Box::new(BasicFilterSet::new()),
    )
}

/// Playlist source document with the given item ids
fn playlist_source(track_ids: &[i64]) -> Value {
    json!({
        "id": 9,
        "name": "playlist-9",
        "track_ids": track_ids,
        "allow_remove": true,
        "allow_move": true,
    })
}
