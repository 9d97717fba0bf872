use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub original_file: String,
    pub translated_file: String,
    pub source_lang: String,
    pub target_lang: String,
    pub domain: String,
    pub rows_translated: usize,
}

/// Completed jobs, oldest first internally, capped at `max_entries`.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: Arc<RwLock<VecDeque<HistoryEntry>>>,
    max_entries: usize,
}

impl HistoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries: max_entries.max(1),
        }
    }

    pub async fn record(&self, entry: HistoryEntry) {
        let mut entries = self.entries.write().await;
        while entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub async fn recent_first(&self) -> Vec<HistoryEntry> {
        self.entries.read().await.iter().rev().cloned().collect()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> HistoryEntry {
        HistoryEntry {
            timestamp: "2024-01-01 00:00:00".to_string(),
            original_file: name.to_string(),
            translated_file: format!("translated_{}", name),
            source_lang: "English".to_string(),
            target_lang: "Chinese".to_string(),
            domain: String::new(),
            rows_translated: 3,
        }
    }

    #[tokio::test]
    async fn lists_most_recent_first() {
        let history = HistoryStore::default();
        history.record(entry("a.xlsx")).await;
        history.record(entry("b.xlsx")).await;

        let listed = history.recent_first().await;
        assert_eq!(listed[0].original_file, "b.xlsx");
        assert_eq!(listed[1].original_file, "a.xlsx");
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let history = HistoryStore::default();
        history.record(entry("a.xlsx")).await;
        history.clear().await;
        assert!(history.is_empty().await);
    }

    #[tokio::test]
    async fn oldest_entries_drop_at_capacity() {
        let history = HistoryStore::new(2);
        for name in ["a", "b", "c"] {
            history.record(entry(name)).await;
        }

        let names: Vec<String> = history
            .recent_first()
            .await
            .into_iter()
            .map(|e| e.original_file)
            .collect();
        assert_eq!(names, vec!["c", "b"]);
    }
}
