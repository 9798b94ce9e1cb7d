/// High-score ledger: the top five (score, speed) pairs, persisted as a
/// JSON array under a single store key.
///
/// Older saves hold bare numbers instead of objects. Those entries are
/// migrated to `{score, speed: default}` before ranking and written back
/// in the current format. A blob that does not parse is reported and left
/// as it is on disk.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{GameError, GameResult};

use super::store::Store;

pub const HIGH_SCORE_KEY: &str = "high_scores";
pub const MAX_ENTRIES: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u32,
    pub speed: u32,
}

/// Either persisted shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Legacy(u32),
    Current(HighScoreEntry),
}

/// Outcome of `record`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighScoreRecord {
    /// 0-based position of the new entry, if it made the table.
    pub rank: Option<usize>,
    pub entries: Vec<HighScoreEntry>,
}

impl HighScoreRecord {
    pub fn is_new_high_score(&self) -> bool {
        self.rank.is_some()
    }
}

pub struct HighScoreLedger<S: Store> {
    store: S,
    default_speed: u32,
}

impl<S: Store> HighScoreLedger<S> {
    /// `default_speed` is assigned to migrated legacy entries.
    pub fn new(store: S, default_speed: u32) -> Self {
        HighScoreLedger { store, default_speed }
    }

    /// Current table, migrated and ranked. Empty if nothing is stored.
    pub fn entries(&self) -> GameResult<Vec<HighScoreEntry>> {
        let Some(blob) = self.store.get(HIGH_SCORE_KEY)? else {
            return Ok(vec![]);
        };
        let stored: Vec<StoredEntry> = serde_json::from_str(&blob).map_err(|e| {
            warn!("high score data is unreadable: {e}");
            GameError::storage(format!("unreadable high score data: {e}"))
        })?;

        let mut entries: Vec<HighScoreEntry> = stored
            .into_iter()
            .map(|entry| match entry {
                StoredEntry::Legacy(score) => HighScoreEntry { score, speed: self.default_speed },
                StoredEntry::Current(entry) => entry,
            })
            .collect();
        // Stable: equal scores keep their stored order.
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_ENTRIES);
        Ok(entries)
    }

    /// Rank a finished game and persist the updated table.
    pub fn record(&mut self, score: u32, speed: u32) -> GameResult<HighScoreRecord> {
        let mut entries = self.entries()?;

        // Behind every equal score already on the table.
        let pos = entries
            .iter()
            .position(|e| e.score < score)
            .unwrap_or(entries.len());
        entries.insert(pos, HighScoreEntry { score, speed });
        entries.truncate(MAX_ENTRIES);
        let rank = (pos < MAX_ENTRIES).then_some(pos);

        let blob = serde_json::to_string(&entries)?;
        self.store.set(HIGH_SCORE_KEY, &blob)?;

        if let Some(r) = rank {
            info!(score, speed, rank = r + 1, "new high score");
        }
        Ok(HighScoreRecord { rank, entries })
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::store::{FileStore, MemoryStore};
    use pretty_assertions::assert_eq;

    fn entry(score: u32, speed: u32) -> HighScoreEntry {
        HighScoreEntry { score, speed }
    }

    fn ledger_with(blob: &str) -> HighScoreLedger<MemoryStore> {
        let mut store = MemoryStore::new();
        store.set(HIGH_SCORE_KEY, blob).unwrap();
        HighScoreLedger::new(store, 90)
    }

    #[test]
    fn first_score_ranks_first() {
        let mut ledger = HighScoreLedger::new(MemoryStore::new(), 90);
        let rec = ledger.record(42, 100).unwrap();
        assert_eq!(rec.rank, Some(0));
        assert_eq!(rec.entries, vec![entry(42, 100)]);
    }

    #[test]
    fn keeps_top_five_descending() {
        let mut ledger = HighScoreLedger::new(MemoryStore::new(), 90);
        for s in [10, 50, 30, 70, 20, 60] {
            ledger.record(s, 90).unwrap();
        }
        let scores: Vec<u32> = ledger.entries().unwrap().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![70, 60, 50, 30, 20]);
    }

    #[test]
    fn low_score_on_full_table_changes_nothing() {
        let mut ledger = ledger_with(
            r#"[{"score":50,"speed":90},{"score":40,"speed":90},{"score":30,"speed":90},
                {"score":20,"speed":90},{"score":10,"speed":90}]"#,
        );
        let before = ledger.entries().unwrap();
        for _ in 0..3 {
            let rec = ledger.record(5, 120).unwrap();
            assert_eq!(rec.rank, None);
            assert!(!rec.is_new_high_score());
            assert_eq!(rec.entries, before);
        }
        // A tie with the fifth entry does not displace it either.
        let rec = ledger.record(10, 120).unwrap();
        assert_eq!(rec.rank, None);
        assert_eq!(rec.entries, before);
    }

    #[test]
    fn legacy_numbers_migrate_to_default_speed() {
        let ledger = ledger_with("[120, 95]");
        assert_eq!(ledger.entries().unwrap(), vec![entry(120, 90), entry(95, 90)]);
    }

    #[test]
    fn legacy_and_native_rank_identically() {
        let mut legacy = ledger_with("[95, 120, 10, 60, 80, 33]");
        let mut native = ledger_with(
            r#"[{"score":95,"speed":90},{"score":120,"speed":90},{"score":10,"speed":90},
                {"score":60,"speed":90},{"score":80,"speed":90},{"score":33,"speed":90}]"#,
        );
        let a = legacy.record(70, 110).unwrap();
        let b = native.record(70, 110).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.rank, Some(3));
        assert_eq!(
            a.entries,
            vec![entry(120, 90), entry(95, 90), entry(80, 90), entry(70, 110), entry(60, 90)]
        );
    }

    #[test]
    fn mixed_formats_are_accepted() {
        let ledger = ledger_with(r#"[30, {"score":45,"speed":100}]"#);
        assert_eq!(ledger.entries().unwrap(), vec![entry(45, 100), entry(30, 90)]);
    }

    #[test]
    fn migration_is_written_back() {
        let mut ledger = ledger_with("[120, 95]");
        ledger.record(1, 90).unwrap();
        let blob = ledger.store().get(HIGH_SCORE_KEY).unwrap().unwrap();
        assert!(blob.contains(r#"{"score":120,"speed":90}"#));
    }

    #[test]
    fn unreadable_blob_is_an_error_and_left_alone() {
        let mut ledger = ledger_with("not json at all");
        let err = ledger.record(10, 90).unwrap_err();
        assert!(matches!(err, GameError::Storage { .. }));
        assert_eq!(
            ledger.store().get(HIGH_SCORE_KEY).unwrap().as_deref(),
            Some("not json at all")
        );
    }

    #[test]
    fn file_backed_ledger_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut ledger = HighScoreLedger::new(FileStore::new(dir.path()), 90);
            ledger.record(77, 100).unwrap();
        }
        let ledger = HighScoreLedger::new(FileStore::new(dir.path()), 90);
        assert_eq!(ledger.entries().unwrap(), vec![entry(77, 100)]);
    }
}
