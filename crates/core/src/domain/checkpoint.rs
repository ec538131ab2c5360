// Checkpoint Schema - durable documents that make a run resumable
// The JSON layout of MasterIndex and BatchFile is the on-disk contract
// consumed by the Checkpoint Store; field names must remain stable.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Category, ItemId};

/// Durable root record of a run: category -> batch-file mapping plus a
/// mirror of the live job's positional fields. Created once, mutated after
/// every batch, never deleted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterIndex {
    pub captured_at: i64, // epoch ms
    pub batch_size: u32,
    pub expected_counts: BTreeMap<Category, u64>,
    pub categories: BTreeMap<Category, CategoryIndex>,
    pub processing: ProcessingState,
}

impl MasterIndex {
    /// Create a fresh index with per-category placeholders seeded
    pub fn new(captured_at: i64, batch_size: u32, expected_counts: BTreeMap<Category, u64>) -> Self {
        let categories = Category::ALL
            .iter()
            .map(|c| (*c, CategoryIndex::default()))
            .collect();
        Self {
            captured_at,
            batch_size,
            expected_counts,
            categories,
            processing: ProcessingState::default(),
        }
    }

    pub fn category(&self, category: Category) -> &CategoryIndex {
        // Placeholders are seeded for every category at creation; the
        // fallback covers indexes deserialized from older documents.
        self.categories
            .get(&category)
            .unwrap_or(&EMPTY_CATEGORY_INDEX)
    }

    pub fn category_mut(&mut self, category: Category) -> &mut CategoryIndex {
        self.categories.entry(category).or_default()
    }

    /// Append a persisted batch file reference for a category
    pub fn push_batch_ref(
        &mut self,
        category: Category,
        batch_number: u32,
        item_count: u32,
        reference: String,
    ) {
        self.category_mut(category).batch_refs.push(BatchRef {
            batch_number,
            item_count,
            reference,
        });
    }

    /// Mark a batch fully processed for a category
    pub fn mark_batch_completed(&mut self, category: Category, batch_number: u32) {
        self.category_mut(category)
            .completed_batches
            .insert(batch_number);
    }

    /// A category is complete when its list is fully collected and every
    /// batch file has been processed
    pub fn is_category_complete(&self, category: Category) -> bool {
        let entry = self.category(category);
        entry.list_complete && entry.completed_batches.len() >= entry.batch_refs.len()
    }
}

static EMPTY_CATEGORY_INDEX: CategoryIndex = CategoryIndex {
    batch_refs: Vec::new(),
    list_complete: false,
    completed_batches: BTreeSet::new(),
};

/// Per-category slice of the master index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryIndex {
    pub batch_refs: Vec<BatchRef>,
    /// True once the category's item list has been fully collected
    pub list_complete: bool,
    pub completed_batches: BTreeSet<u32>,
}

impl CategoryIndex {
    /// Next batch number to assign during list creation
    pub fn next_batch_number(&self) -> u32 {
        self.batch_refs.len() as u32
    }

    /// Total items across all persisted batch files
    pub fn total_items(&self) -> u64 {
        self.batch_refs.iter().map(|r| r.item_count as u64).sum()
    }
}

/// Reference to one persisted batch file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRef {
    pub batch_number: u32,
    pub item_count: u32,
    pub reference: String,
}

/// Numbered slice of a category's work list.
/// Never mutated once its index entry exists (the index, not the batch
/// file, tracks completion); rewritten only when crash recovery
/// re-collects a batch the index never referenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    pub batch_number: u32,
    pub category: Category,
    pub items: Vec<ItemId>,
    pub captured_at: i64, // epoch ms
}

/// Mirror of the live job's positional fields, persisted with the index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub current_category: Option<Category>,
    pub current_batch: u32,
    pub current_index: u32,
}

/// Partition items into fixed-size batches; the last batch may be shorter.
///
/// `batch_size` is validated > 0 upstream.
pub fn split_into_batches(items: &[ItemId], batch_size: u32) -> Vec<Vec<ItemId>> {
    let size = batch_size.max(1) as usize;
    items.chunks(size).map(|chunk| chunk.to_vec()).collect()
}
