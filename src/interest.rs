use std::collections::HashSet;

use crate::world::{gen::SECTIONS_PER_COLUMN, ChunkPos, IntVec3};

/// Columns of the square with half-width `radius` around `center`.
pub fn required_columns(center: ChunkPos, radius: i32) -> Vec<ChunkPos> {
    let mut columns = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)).max(0) as usize);
    for x in -radius..=radius {
        for z in -radius..=radius {
            columns.push(ChunkPos::new(center.x + x, center.z + z));
        }
    }
    columns
}

/// Origins of every chunk a client at `center` should hold.
pub fn required_chunks(center: ChunkPos, radius: i32) -> HashSet<IntVec3> {
    required_columns(center, radius)
        .into_iter()
        .flat_map(|column| (0..SECTIONS_PER_COLUMN).map(move |section| column.chunk_origin(section)))
        .collect()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChunkDiff {
    pub load: Vec<IntVec3>,
    pub unload: Vec<IntVec3>,
}

impl ChunkDiff {
    pub fn between(old: &HashSet<IntVec3>, new: &HashSet<IntVec3>) -> ChunkDiff {
        let mut load: Vec<IntVec3> = new.difference(old).copied().collect();
        let mut unload: Vec<IntVec3> = old.difference(new).copied().collect();
        load.sort();
        unload.sort();
        ChunkDiff { load, unload }
    }

    pub fn is_empty(&self) -> bool {
        self.load.is_empty() && self.unload.is_empty()
    }
}

/// Tracks which column a client is in and which chunks it holds.
#[derive(Debug, Default)]
pub struct InterestState {
    column: Option<ChunkPos>,
    loaded: HashSet<IntVec3>,
}

impl InterestState {
    pub fn new() -> InterestState {
        Default::default()
    }

    pub fn column(&self) -> Option<ChunkPos> {
        self.column
    }

    pub fn loaded(&self) -> &HashSet<IntVec3> {
        &self.loaded
    }

    /// Recomputes the interest set when `column` differs from the last one.
    /// Returns `None` while the client stays inside the same column.
    pub fn update(&mut self, column: ChunkPos, radius: i32) -> Option<ChunkDiff> {
        if self.column == Some(column) {
            return None;
        }
        self.column = Some(column);

        let required = required_chunks(column, radius);
        let diff = ChunkDiff::between(&self.loaded, &required);
        self.loaded = required;
        Some(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_requires_full_square() {
        let chunks = required_chunks(ChunkPos::new(0, 0), 2);
        assert_eq!(chunks.len(), 5 * 5 * 16);
        assert!(chunks.contains(&IntVec3::new(-32, 240, 32)));
        assert!(!chunks.contains(&IntVec3::new(48, 0, 0)));
    }

    #[test]
    fn diff_partitions_symmetric_difference() {
        let old = required_chunks(ChunkPos::new(0, 0), 2);
        let new = required_chunks(ChunkPos::new(1, 0), 2);
        let diff = ChunkDiff::between(&old, &new);

        let load: HashSet<IntVec3> = diff.load.iter().copied().collect();
        let unload: HashSet<IntVec3> = diff.unload.iter().copied().collect();
        let sym: HashSet<IntVec3> = old.symmetric_difference(&new).copied().collect();

        assert!(load.is_disjoint(&unload));
        assert_eq!(&load | &unload, sym);
        assert!(load.is_subset(&new) && load.is_disjoint(&old));
        assert!(unload.is_subset(&old) && unload.is_disjoint(&new));
    }

    #[test]
    fn moving_one_column_swaps_one_row() {
        let mut state = InterestState::new();
        let join = state.update(ChunkPos::new(0, 0), 2).unwrap();
        assert_eq!(join.load.len(), 400);
        assert!(join.unload.is_empty());

        assert_eq!(state.update(ChunkPos::new(0, 0), 2), None);

        let step = state.update(ChunkPos::new(1, 0), 2).unwrap();
        assert_eq!(step.load.len(), 5 * 16);
        assert_eq!(step.unload.len(), 5 * 16);
        assert!(step.load.iter().all(|o| o.x == 48));
        assert!(step.unload.iter().all(|o| o.x == -32));
        assert_eq!(state.loaded().len(), 400);
    }

    #[test]
    fn teleport_replaces_everything() {
        let mut state = InterestState::new();
        state.update(ChunkPos::new(0, 0), 1);
        let diff = state.update(ChunkPos::new(100, -100), 1).unwrap();
        assert_eq!(diff.load.len(), 9 * 16);
        assert_eq!(diff.unload.len(), 9 * 16);
        assert_eq!(state.column(), Some(ChunkPos::new(100, -100)));
    }
}
