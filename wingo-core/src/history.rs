use serde::{Deserialize, Serialize};

use crate::issue::IssueId;
use crate::models::DrawRecord;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Historique borné des tirages, du plus récent au plus ancien.
///
/// records[0] porte toujours la plus grande période observée ; les périodes sont
/// strictement décroissantes et sans doublon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryBuffer {
    records: Vec<DrawRecord>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn head(&self) -> Option<&DrawRecord> {
        self.records.first()
    }

    pub fn head_issue(&self) -> Option<&IssueId> {
        self.head().map(|r| &r.issue)
    }

    /// Tirages du plus récent au plus ancien.
    pub fn records(&self) -> &[DrawRecord] {
        &self.records
    }

    pub fn recent(&self, n: usize) -> &[DrawRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Intègre une page du flux (ordre quelconque) et retourne les tirages réellement
    /// nouveaux, du plus récent au plus ancien.
    ///
    /// Seuls les tirages strictement plus récents que la tête actuelle sont retenus ;
    /// une page dont la tête n'a pas avancé ne modifie rien.
    pub fn merge(&mut self, page: &[DrawRecord]) -> Vec<DrawRecord> {
        let mut fresh: Vec<DrawRecord> = page
            .iter()
            .filter(|r| match self.head_issue() {
                Some(head) => r.issue > *head,
                None => true,
            })
            .cloned()
            .collect();

        fresh.sort_by(|a, b| b.issue.cmp(&a.issue));
        fresh.dedup_by(|a, b| a.issue == b.issue);
        fresh.truncate(self.capacity);

        if fresh.is_empty() {
            return fresh;
        }

        self.records.splice(0..0, fresh.iter().cloned());
        self.records.truncate(self.capacity);
        fresh
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
