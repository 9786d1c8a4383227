#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that derives enemy paths from the tile map.
//!
//! Tracing is a deterministic single-successor walk: from the current cell
//! the tracer checks its neighbours north, east, south and west and steps to
//! the first path tile it has not visited yet. Maps whose paths fork are
//! traced along whichever branch appears first in that order.

use tile_defence_core::{CellCoord, Path, PathError, TileMap, MAX_PATH_POINTS};

/// Path tracer that reuses its visited-cell buffer between traces.
#[derive(Debug, Default)]
pub struct PathTracer {
    visited: Vec<bool>,
}

impl PathTracer {
    /// Creates a new tracer with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Traces the path that starts at `start`, returning waypoint centers in
    /// travel order.
    ///
    /// The walk ends when no unvisited path neighbour remains or once
    /// [`MAX_PATH_POINTS`] waypoints were collected.
    pub fn trace(&mut self, map: &TileMap, start: CellCoord) -> Result<Path, PathError> {
        if !map.contains(start) {
            log::error!("path start {start} lies outside the map");
            return Err(PathError::StartOutOfBounds { cell: start });
        }
        if !map.is_path_tile(start) {
            log::error!("path start {start} is not a path tile");
            return Err(PathError::StartNotPath { cell: start });
        }

        let width = usize::try_from(map.columns()).unwrap_or(0);
        let height = usize::try_from(map.rows()).unwrap_or(0);
        self.visited.clear();
        self.visited.resize(width.saturating_mul(height), false);

        let mut path = Path::default();
        let mut current = start;
        loop {
            self.mark(width, current);
            if !path.push(map.cell_center(current)) || path.len() >= MAX_PATH_POINTS {
                break;
            }

            let next = neighbors(current, map.columns(), map.rows())
                .find(|cell| map.is_path_tile(*cell) && !self.is_visited(width, *cell));
            match next {
                Some(cell) => current = cell,
                None => break,
            }
        }

        log::debug!("traced {} waypoints from {start}", path.len());
        Ok(path)
    }

    fn mark(&mut self, width: usize, cell: CellCoord) {
        if let Some(slot) = index(width, cell).and_then(|index| self.visited.get_mut(index)) {
            *slot = true;
        }
    }

    fn is_visited(&self, width: usize, cell: CellCoord) -> bool {
        index(width, cell)
            .and_then(|index| self.visited.get(index).copied())
            .unwrap_or(true)
    }
}

/// Traces a path with a throwaway tracer.
pub fn trace_path(map: &TileMap, start: CellCoord) -> Result<Path, PathError> {
    PathTracer::new().trace(map, start)
}

fn neighbors(cell: CellCoord, width: u32, height: u32) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }

    if let Some(column) = cell.column().checked_add(1) {
        if column < width {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < height {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}

fn index(width: usize, cell: CellCoord) -> Option<usize> {
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
