use serde::{Deserialize, Serialize};

use crate::persistence::StoreResult;

/// One unit in the fixed teaching sequence. Ordering by `id` ascending IS
/// the curriculum order; items only ever append once created, otherwise
/// previously recorded cursors would lose their meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumItem {
    pub id: i64,
    pub value: String,
}

/// Read side consumed by the distributor.
pub trait CurriculumStore {
    /// All items, ordered by id ascending.
    fn all_items(&self) -> StoreResult<Vec<CurriculumItem>>;

    fn count(&self) -> StoreResult<usize>;

    fn value_of(&self, id: i64) -> StoreResult<Option<String>>;
}

/// In-memory curriculum, kept sorted by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Curriculum {
    items: Vec<CurriculumItem>,
}

impl Curriculum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(mut items: Vec<CurriculumItem>) -> Self {
        items.sort_by_key(|item| item.id);
        Self { items }
    }

    /// Append a new item and return its id.
    pub fn push(&mut self, value: impl Into<String>) -> i64 {
        let id = self.items.last().map(|item| item.id + 1).unwrap_or(1);
        self.items.push(CurriculumItem {
            id,
            value: value.into(),
        });
        id
    }

    pub fn items(&self) -> &[CurriculumItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CurriculumStore for Curriculum {
    fn all_items(&self) -> StoreResult<Vec<CurriculumItem>> {
        Ok(self.items.clone())
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.items.len())
    }

    fn value_of(&self, id: i64) -> StoreResult<Option<String>> {
        Ok(self
            .items
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.value.clone()))
    }
}
