//! In-memory reference backends for the collaborator traits.
//!
//! `MemoryCatalog` implements both sides of the catalog interface with the
//! idempotent natural-key upsert the real store must provide. It backs the
//! integration tests and lets embedders run the whole pipeline without a
//! persistent store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CatalogEntry, ReviewPayload, UpsertEntry};
use crate::text::normalize;
use crate::traits::{CatalogReader, CatalogWriter, ReviewSink};

/// In-memory catalog store with idempotent natural-key upserts.
#[derive(Default)]
pub struct MemoryCatalog {
    entries: RwLock<Vec<CatalogEntry>>,
    /// Last-written item payload per entity; last-wins keeps retried
    /// commits convergent.
    items: RwLock<HashMap<Uuid, serde_json::Value>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog pre-populated with entries.
    pub fn with_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entities currently stored.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the catalog holds no entities.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// The last item payload written for an entity, if any.
    pub async fn item_for(&self, id: Uuid) -> Option<serde_json::Value> {
        self.items.read().await.get(&id).cloned()
    }

    fn entry_key(entry: &CatalogEntry) -> String {
        let vintage = entry
            .vintage
            .map(|v| v.to_string())
            .unwrap_or_else(|| "nv".to_string());
        format!(
            "{}|{}|{}",
            normalize(&entry.producer),
            normalize(&entry.wine_name),
            vintage
        )
    }
}

#[async_trait]
impl CatalogReader for MemoryCatalog {
    async fn search(&self, text: &str) -> Result<Vec<CatalogEntry>> {
        let needle = normalize(text);
        let entries = self.entries.read().await;
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(entries
            .iter()
            .filter(|e| {
                normalize(&e.producer).contains(&needle)
                    || normalize(&e.wine_name).contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn snapshot(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.entries.read().await.clone())
    }
}

#[async_trait]
impl CatalogWriter for MemoryCatalog {
    async fn upsert(&self, entry: UpsertEntry) -> Result<Uuid> {
        let key = entry.natural_key();
        let mut entries = self.entries.write().await;

        let id = match entries.iter_mut().find(|e| Self::entry_key(e) == key) {
            Some(existing) => {
                // Converge: enrich missing optional fields, never overwrite
                // identity.
                if existing.color.is_none() {
                    existing.color = entry.color.clone();
                }
                if existing.alcohol_percent.is_none() {
                    existing.alcohol_percent = entry.alcohol_percent;
                }
                if existing.bottle_size.is_none() {
                    existing.bottle_size = entry.bottle_size.clone();
                }
                existing.id
            }
            None => {
                let created = CatalogEntry {
                    id: Uuid::new_v4(),
                    producer: entry.producer.clone(),
                    wine_name: entry.wine_name.clone(),
                    vintage: entry.vintage,
                    color: entry.color.clone(),
                    alcohol_percent: entry.alcohol_percent,
                    bottle_size: entry.bottle_size.clone(),
                };
                let id = created.id;
                entries.push(created);
                id
            }
        };
        drop(entries);

        if let Some(item) = entry.item {
            self.items.write().await.insert(id, item);
        }

        Ok(id)
    }
}

/// In-memory review queue for tests and embedders.
#[derive(Default)]
pub struct MemoryReviewSink {
    queue: RwLock<Vec<ReviewPayload>>,
}

impl MemoryReviewSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain all queued payloads.
    pub async fn drain(&self) -> Vec<ReviewPayload> {
        std::mem::take(&mut *self.queue.write().await)
    }

    /// Number of queued payloads.
    pub async fn len(&self) -> usize {
        self.queue.read().await.len()
    }

    /// Whether the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.queue.read().await.is_empty()
    }
}

#[async_trait]
impl ReviewSink for MemoryReviewSink {
    async fn enqueue(&self, payload: ReviewPayload) -> Result<()> {
        self.queue.write().await.push(payload);
        Ok(())
    }
}
