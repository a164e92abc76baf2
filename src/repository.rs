use std::time::{SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::domain::{RowId, WardError};
use crate::table::Row;

/// Storage behind a page. Pages only talk to this trait so the in-memory
/// collection can be swapped for a real store.
pub trait Repository<T: Row> {
    /// All rows in insertion order.
    fn all(&self) -> &[T];
    fn get(&self, id: RowId) -> Option<&T>;
    fn insert(&mut self, row: T);
    /// Replaces the row with the same id, keeping its position.
    fn replace(&mut self, row: T) -> Result<(), WardError>;
    fn remove(&mut self, id: RowId) -> Result<T, WardError>;
    /// A fresh id for a row created now.
    fn next_id(&self) -> RowId;
}

#[derive(Debug, Clone)]
pub struct InMemoryRepository<T> {
    rows: Vec<T>,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: Row> InMemoryRepository<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows }
    }

    fn position(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id() == id)
    }
}

impl<T: Row> Repository<T> for InMemoryRepository<T> {
    fn all(&self) -> &[T] {
        &self.rows
    }

    fn get(&self, id: RowId) -> Option<&T> {
        self.rows.iter().find(|r| r.id() == id)
    }

    fn insert(&mut self, row: T) {
        trace!("Insert row {}", row.id());
        self.rows.push(row);
    }

    fn replace(&mut self, row: T) -> Result<(), WardError> {
        let idx = self.position(row.id()).ok_or(WardError::UnknownRow(row.id()))?;
        trace!("Replace row {} at {idx}", row.id());
        self.rows[idx] = row;
        Ok(())
    }

    fn remove(&mut self, id: RowId) -> Result<T, WardError> {
        let idx = self.position(id).ok_or(WardError::UnknownRow(id))?;
        trace!("Remove row {id} at {idx}");
        Ok(self.rows.remove(idx))
    }

    fn next_id(&self) -> RowId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as RowId)
            .unwrap_or(0);
        let max = self.rows.iter().map(Row::id).max().unwrap_or(0);
        now.max(max + 1)
    }
}
