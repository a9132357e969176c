use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Most notes the snapshot keeps; merges beyond this evict from the tail.
pub const MAX_NOTES: usize = 10;

/// One scanned note as the dashboard sees it. Serialized field names match
/// the snapshot file, which predates this binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub title: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_iso: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Duplicate,
}

/// Newest-first working set of notes, bounded at [`MAX_NOTES`].
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    notes: Vec<Note>,
}

impl NoteStore {
    /// Read the snapshot file. A missing file is an empty store; an
    /// oversized one is truncated to the cap on the way in.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let mut notes: Vec<Note> = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed snapshot {}", path.display()))?;
        notes.truncate(MAX_NOTES);
        Ok(Self { notes })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.notes)?;
        fs::write(path, raw)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(())
    }

    /// Insert a note at the head unless the store already has it. Two notes
    /// are the same when title and date both match, or when both carry the
    /// same source message id. Inserting past the cap evicts the oldest.
    pub fn merge(&mut self, incoming: Note) -> MergeOutcome {
        let already_present = self.notes.iter().any(|note| {
            (note.title == incoming.title && note.date == incoming.date)
                || (note.source_id.is_some() && note.source_id == incoming.source_id)
        });
        if already_present {
            return MergeOutcome::Duplicate;
        }
        self.notes.insert(0, incoming);
        self.notes.truncate(MAX_NOTES);
        MergeOutcome::Inserted
    }

    /// Notes in dashboard order, newest first.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str, date: &str) -> Note {
        Note {
            title: title.to_string(),
            date: date.to_string(),
            date_iso: None,
            url: None,
            source_id: None,
            added_at: None,
        }
    }

    fn sourced(title: &str, date: &str, source_id: &str) -> Note {
        Note {
            source_id: Some(source_id.to_string()),
            ..note(title, date)
        }
    }

    #[test]
    fn merge_inserts_at_head() {
        let mut store = NoteStore::default();
        store.merge(note("older", "01 Feb 2026"));
        store.merge(note("newer", "02 Feb 2026"));
        let titles: Vec<_> = store.notes().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["newer", "older"]);
    }

    #[test]
    fn merge_reports_outcome() {
        let mut store = NoteStore::default();
        assert_eq!(store.merge(note("a", "01 Feb 2026")), MergeOutcome::Inserted);
        assert_eq!(store.merge(note("a", "01 Feb 2026")), MergeOutcome::Duplicate);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut store = NoteStore::default();
        store.merge(note("a", "01 Feb 2026"));
        store.merge(note("b", "02 Feb 2026"));
        let snapshot = store.notes().to_vec();
        assert_eq!(store.merge(note("b", "02 Feb 2026")), MergeOutcome::Duplicate);
        assert_eq!(store.notes(), snapshot.as_slice());
    }

    #[test]
    fn title_and_date_both_required_for_a_duplicate() {
        let mut store = NoteStore::default();
        store.merge(note("standup", "01 Feb 2026"));
        assert_eq!(store.merge(note("standup", "08 Feb 2026")), MergeOutcome::Inserted);
        assert_eq!(store.merge(note("retro", "01 Feb 2026")), MergeOutcome::Inserted);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn duplicate_by_key_ignores_other_fields() {
        let mut store = NoteStore::default();
        store.merge(note("a", "01 Feb 2026"));
        let mut richer = note("a", "01 Feb 2026");
        richer.url = Some("https://example.com/a.pdf".to_string());
        richer.source_id = Some("msg-1".to_string());
        assert_eq!(store.merge(richer), MergeOutcome::Duplicate);
        assert_eq!(store.len(), 1);
        assert!(store.notes()[0].url.is_none());
    }

    #[test]
    fn duplicate_by_source_id_despite_renamed_title() {
        let mut store = NoteStore::default();
        store.merge(sourced("original title", "01 Feb 2026", "msg-1"));
        assert_eq!(
            store.merge(sourced("edited title", "02 Feb 2026", "msg-1")),
            MergeOutcome::Duplicate
        );
    }

    #[test]
    fn absent_source_ids_never_match_each_other() {
        let mut store = NoteStore::default();
        store.merge(note("a", "01 Feb 2026"));
        assert_eq!(store.merge(note("b", "02 Feb 2026")), MergeOutcome::Inserted);
    }

    #[test]
    fn cap_evicts_the_oldest() {
        let mut store = NoteStore::default();
        for i in 0..11 {
            store.merge(note(&format!("note {i}"), &format!("{:02} Jan 2026", i + 1)));
        }
        assert_eq!(store.len(), MAX_NOTES);
        assert_eq!(store.notes()[0].title, "note 10");
        assert_eq!(store.notes()[MAX_NOTES - 1].title, "note 1");
        assert!(store.notes().iter().all(|n| n.title != "note 0"));
    }

    #[test]
    fn no_two_entries_share_a_key() {
        let mut store = NoteStore::default();
        for i in 0..20 {
            store.merge(note(&format!("note {}", i % 7), "01 Feb 2026"));
        }
        for (i, a) in store.notes().iter().enumerate() {
            for b in store.notes().iter().skip(i + 1) {
                assert!(a.title != b.title || a.date != b.date);
            }
        }
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");

        let mut store = NoteStore::default();
        let mut full = sourced("Lecture 4", "15 Feb 2026", "msg-9");
        full.date_iso = Some("2026-02-15".to_string());
        full.url = Some("https://drive.google.com/file/d/abc/view".to_string());
        store.merge(note("plain", "01 Feb 2026"));
        store.merge(full);
        store.save(&path).unwrap();

        let reloaded = NoteStore::load(&path).unwrap();
        assert_eq!(reloaded.notes(), store.notes());
    }

    #[test]
    fn snapshot_uses_camel_case_and_omits_empty_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");

        let mut store = NoteStore::default();
        store.merge(sourced("a", "01 Feb 2026", "msg-1"));
        store.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"sourceId\""));
        assert!(!raw.contains("\"dateIso\""));
        assert!(!raw.contains("\"url\""));
    }

    #[test]
    fn load_truncates_oversized_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");

        let oversized: Vec<Note> = (0..15)
            .map(|i| note(&format!("note {i}"), "01 Feb 2026"))
            .collect();
        fs::write(&path, serde_json::to_string(&oversized).unwrap()).unwrap();

        let store = NoteStore::load(&path).unwrap();
        assert_eq!(store.len(), MAX_NOTES);
        assert_eq!(store.notes()[0].title, "note 0");
    }

    #[test]
    fn load_rejects_malformed_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, "{ not json ]").unwrap();
        assert!(NoteStore::load(&path).is_err());
    }
}
