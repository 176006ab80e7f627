use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type NoteId = i64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub text: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Ordered note list plus the active search query.
///
/// Display order is most-recently-created first. Ids are unique at all times.
#[derive(Debug, Clone, Default)]
pub struct NoteState {
    notes: Vec<Note>,
    query: String,
}

impl NoteState {
    pub fn new(notes: Vec<Note>) -> Self {
        let mut state = NoteState::default();
        // Later duplicates lose to the first occurrence in snapshot order.
        for note in notes {
            if state.get(note.id).is_none() {
                state.notes.push(note);
            }
        }
        state
    }

    /// Builds the initial state from an injected snapshot value.
    ///
    /// Accepts either a bare array of notes or `{"notes": [...]}`. Anything
    /// else, including individual malformed entries, yields an empty state.
    pub fn from_snapshot(value: &Value) -> Self {
        let list = match value {
            Value::Array(_) => value,
            Value::Object(map) => match map.get("notes") {
                Some(list) => list,
                None => return NoteState::default(),
            },
            _ => return NoteState::default(),
        };
        match serde_json::from_value::<Vec<Note>>(list.clone()) {
            Ok(notes) => NoteState::new(notes),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed note snapshot");
                NoteState::default()
            }
        }
    }

    pub fn insert_front(&mut self, note: Note) {
        self.notes.retain(|n| n.id != note.id);
        self.notes.insert(0, note);
    }

    /// Swaps the note with `id` in place. Returns false when `id` is absent.
    pub fn replace(&mut self, id: NoteId, note: Note) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if note.id != id {
            self.notes.retain(|n| n.id != note.id);
        }
        match self.notes.iter().position(|n| n.id == id) {
            Some(idx) => {
                self.notes[idx] = note;
                true
            }
            None => false,
        }
    }

    pub fn remove_by_id(&mut self, id: NoteId) -> Option<Note> {
        let idx = self.notes.iter().position(|n| n.id == id)?;
        Some(self.notes.remove(idx))
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn all(&self) -> &[Note] {
        &self.notes
    }

    pub fn filtered(&self) -> Vec<&Note> {
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            return self.notes.iter().collect();
        }
        self.notes
            .iter()
            .filter(|n| n.text.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn note(id: NoteId, text: &str) -> Note {
    Note {
        id,
        text: text.to_string(),
        created_at: "2026-01-01T10:00:00".to_string(),
        updated_at: None,
        deadline: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(notes: &[Note]) -> Vec<NoteId> {
        notes.iter().map(|n| n.id).collect()
    }

    #[test]
    fn insert_front_places_new_note_first() {
        let mut state = NoteState::new(vec![note(1, "a"), note(2, "b")]);
        state.insert_front(note(3, "c"));
        assert_eq!(ids(state.all()), vec![3, 1, 2]);
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn insert_front_keeps_ids_unique() {
        let mut state = NoteState::new(vec![note(1, "a"), note(2, "b")]);
        state.insert_front(note(2, "b again"));
        assert_eq!(ids(state.all()), vec![2, 1]);
        assert_eq!(state.get(2).map(|n| n.text.as_str()), Some("b again"));
    }

    #[test]
    fn replace_keeps_position() {
        let mut state = NoteState::new(vec![note(1, "a"), note(2, "b"), note(3, "c")]);
        assert!(state.replace(2, note(2, "B")));
        assert_eq!(ids(state.all()), vec![1, 2, 3]);
        assert_eq!(state.all()[1].text, "B");
    }

    #[test]
    fn replace_missing_id_is_noop() {
        let mut state = NoteState::new(vec![note(1, "a")]);
        assert!(!state.replace(9, note(9, "x")));
        assert_eq!(ids(state.all()), vec![1]);
    }

    #[test]
    fn remove_by_id_preserves_survivor_order() {
        let mut state = NoteState::new(vec![note(1, "a"), note(2, "b"), note(3, "c")]);
        let removed = state.remove_by_id(2);
        assert_eq!(removed.map(|n| n.id), Some(2));
        assert_eq!(ids(state.all()), vec![1, 3]);
        assert!(state.remove_by_id(2).is_none());
    }

    #[test]
    fn filtered_is_case_insensitive_substring() {
        let mut state = NoteState::new(vec![
            note(1, "Buy MILK"),
            note(2, "call mom"),
            note(3, "milkshake"),
        ]);
        state.set_query("milk");
        let hits: Vec<NoteId> = state.filtered().iter().map(|n| n.id).collect();
        assert_eq!(hits, vec![1, 3]);
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let mut state = NoteState::new(vec![note(2, "b"), note(1, "a")]);
        state.set_query("");
        let hits: Vec<NoteId> = state.filtered().iter().map(|n| n.id).collect();
        assert_eq!(hits, vec![2, 1]);
        state.set_query("a");
        state.clear_query();
        assert_eq!(state.query(), "");
        assert_eq!(state.filtered().len(), 2);
    }

    #[test]
    fn snapshot_accepts_wrapped_and_bare_lists() {
        let wrapped = json!({"notes": [
            {"id": 1, "text": "a", "created_at": "2026-01-01T10:00:00", "deadline": null}
        ]});
        assert_eq!(NoteState::from_snapshot(&wrapped).len(), 1);

        let bare = json!([
            {"id": 1, "text": "a", "created_at": "x"},
            {"id": 2, "text": "b", "created_at": "y", "deadline": "2026-02-01T09:00:00"}
        ]);
        let state = NoteState::from_snapshot(&bare);
        assert_eq!(ids(state.all()), vec![1, 2]);
        assert_eq!(state.all()[1].deadline.as_deref(), Some("2026-02-01T09:00:00"));
    }

    #[test]
    fn malformed_snapshot_is_empty() {
        assert!(NoteState::from_snapshot(&json!("nope")).is_empty());
        assert!(NoteState::from_snapshot(&json!({"other": []})).is_empty());
        assert!(NoteState::from_snapshot(&json!([{"id": "x"}])).is_empty());
    }
}
