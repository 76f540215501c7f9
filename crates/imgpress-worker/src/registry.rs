//! Ordered in-memory collection of image records

use uuid::Uuid;

use imgpress_core::{ImageRecord, ImageStatus};

/// Records in ingestion order, addressed by id.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    records: Vec<ImageRecord>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record and return its id
    pub fn push(&mut self, record: ImageRecord) -> Uuid {
        let id = record.id();
        self.records.push(record);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut ImageRecord> {
        self.records.iter_mut().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: Uuid) -> Option<ImageRecord> {
        let idx = self.records.iter().position(|r| r.id() == id)?;
        Some(self.records.remove(idx))
    }

    /// Drop every record, returning how many there were
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    /// Ids of records matching `predicate`, in registry order
    pub fn ids_where(&self, predicate: impl Fn(&ImageRecord) -> bool) -> Vec<Uuid> {
        self.records
            .iter()
            .filter(|r| predicate(*r))
            .map(|r| r.id())
            .collect()
    }

    pub fn any_with_status(&self, status: ImageStatus) -> bool {
        self.records.iter().any(|r| r.status() == status)
    }

    pub fn count_with_status(&self, status: ImageStatus) -> usize {
        self.records.iter().filter(|r| r.status() == status).count()
    }

    /// Owned copy of every record
    pub fn snapshot(&self) -> Vec<ImageRecord> {
        self.records.clone()
    }
}
