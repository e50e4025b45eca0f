use quiver_core::{QuiverError, QuiverResult, Record};
use std::collections::HashMap;

/// Ordered in-memory collection of indexed records.
///
/// Order is insertion order, except that upserting an existing id removes
/// the old entry and appends the new one, so updated records migrate to the
/// tail. Order only matters as the tie-break between equal scores.
///
/// Vector shape is never validated on upsert: the dimensionality is whatever
/// the embedding provider returned.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    records: Vec<Record>,
}

impl VectorIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index holds no record.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in index order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Inserts or replaces records by id.
    ///
    /// Existing records sharing an incoming id are dropped, then the incoming
    /// records are appended in input order. When the batch itself repeats an
    /// id, the last occurrence wins.
    pub fn upsert(&mut self, incoming: Vec<Record>) {
        let last_pos: HashMap<&str, usize> = incoming
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        self.records.retain(|r| !last_pos.contains_key(r.id.as_str()));

        let keep: Vec<bool> = incoming
            .iter()
            .enumerate()
            .map(|(i, r)| last_pos.get(r.id.as_str()) == Some(&i))
            .collect();

        self.records.extend(
            incoming
                .into_iter()
                .zip(keep)
                .filter_map(|(r, keep)| keep.then_some(r)),
        );
    }

    /// Clears the index, then upserts `records`.
    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.records.clear();
        self.upsert(records);
    }

    /// Removes the record with `id`. Returns whether one was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() < before
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Copy of the full ordered record sequence.
    pub fn export_snapshot(&self) -> Vec<Record> {
        self.records.clone()
    }

    /// Replaces the whole index with `records`, verbatim.
    ///
    /// In strict mode every record must carry a non-empty finite vector;
    /// otherwise the import fails before anything is touched.
    pub fn import_snapshot(&mut self, records: Vec<Record>, strict: bool) -> QuiverResult<()> {
        if strict {
            validate_vectors(&records)?;
        }
        self.records = records;
        Ok(())
    }
}

/// Fails on the first record without a usable vector.
pub fn validate_vectors(records: &[Record]) -> QuiverResult<()> {
    match records.iter().find(|r| !r.has_valid_vector()) {
        Some(bad) => Err(QuiverError::InvalidInput(format!(
            "Item with id {} is missing a valid vector",
            bad.id
        ))),
        None => Ok(()),
    }
}
