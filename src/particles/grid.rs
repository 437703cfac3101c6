//! Uniform spatial hash for neighbour queries.

use std::collections::HashMap;

use glam::Vec2;

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        SpatialGrid {
            cell_size: cell_size.max(f32::EPSILON),
            cells: HashMap::new(),
        }
    }

    /// Empty every cell, keeping allocations.
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, index: usize, pos: Vec2) {
        let cell = self.cell_of(pos);
        self.cells.entry(cell).or_default().push(index);
    }

    pub fn rebuild(&mut self, positions: impl IntoIterator<Item = Vec2>) {
        self.clear();
        for (i, pos) in positions.into_iter().enumerate() {
            self.insert(i, pos);
        }
    }

    /// Indices in every cell overlapping the square around `pos` of
    /// half-width `radius`. Callers still test exact distance.
    pub fn query_radius(&self, pos: Vec2, radius: f32) -> Vec<usize> {
        let (cx, cy) = self.cell_of(pos);
        let reach = (radius / self.cell_size).ceil() as i32;

        let mut found = Vec::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                if let Some(indices) = self.cells.get(&(cx + dx, cy + dy)) {
                    found.extend_from_slice(indices);
                }
            }
        }
        found
    }
}
