//! Uniform-grid spatial hash over creature positions.
//!
//! Entries are creature ids. Queries walk the covered cell range in
//! row-major order and cells keep insertion order, so iteration order is a
//! pure function of the insert/remove history. The world relies on this for
//! reproducible runs.

use std::collections::HashMap;

pub type CreatureId = u64;

type CellKey = (i32, i32);

#[derive(Debug)]
pub struct SpatialHash {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<CreatureId>>,
    /// Reverse index: which cell each id currently occupies.
    keys: HashMap<CreatureId, CellKey>,
}

impl SpatialHash {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            keys: HashMap::new(),
        }
    }

    fn key_for(&self, x: f64, y: f64) -> CellKey {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert or move an id to the cell covering (x, y). A no-op when the
    /// id already sits in that cell.
    pub fn insert(&mut self, id: CreatureId, x: f64, y: f64) {
        let key = self.key_for(x, y);

        if let Some(&old) = self.keys.get(&id) {
            if old == key {
                return;
            }
            if let Some(cell) = self.cells.get_mut(&old) {
                cell.retain(|&other| other != id);
            }
        }

        self.cells.entry(key).or_default().push(id);
        self.keys.insert(id, key);
    }

    pub fn remove(&mut self, id: CreatureId) {
        if let Some(key) = self.keys.remove(&id) {
            if let Some(cell) = self.cells.get_mut(&key) {
                cell.retain(|&other| other != id);
            }
        }
    }

    /// All ids in cells overlapping the axis-aligned box, in deterministic
    /// cell-scan order.
    pub fn query_area(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> Vec<CreatureId> {
        let (ix1, iy1) = self.key_for(x1, y1);
        let (ix2, iy2) = self.key_for(x2, y2);

        let mut out = Vec::new();
        for iy in iy1..=iy2 {
            for ix in ix1..=ix2 {
                if let Some(cell) = self.cells.get(&(ix, iy)) {
                    out.extend_from_slice(cell);
                }
            }
        }
        out
    }
}
