use crate::quilt_pipeline::layout::types::{QuiltGrid, QuiltLayout, TilePlacement};

/// Maps view `index` (reading order) to its tile in the canvas.
///
/// Views are numbered left to right starting from the bottom row of the quilt,
/// while the canvas is addressed from the top, so the tile row is inverted:
/// `row = rows - 1 - index / cols`. Returns `None` for indices past the last view.
pub fn placement_for(
    index: u32,
    grid: QuiltGrid,
    tile_width: u32,
    tile_height: u32,
) -> Option<TilePlacement> {
    if index >= grid.view_count() {
        return None;
    }
    let column = index % grid.cols();
    let row = grid.rows() - 1 - index / grid.cols();
    Some(TilePlacement {
        column,
        row,
        x: column * tile_width,
        y: row * tile_height,
    })
}

impl QuiltLayout {
    pub fn placement(&self, index: u32) -> Option<TilePlacement> {
        placement_for(index, self.grid, self.tile_width, self.tile_height)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn xy(index: u32, grid: QuiltGrid, tw: u32, th: u32) -> (u32, u32) {
        let p = placement_for(index, grid, tw, th).unwrap();
        (p.x, p.y)
    }

    #[test]
    fn rows_are_inverted_for_two_by_three() {
        let grid = QuiltGrid::new(2, 3).unwrap();
        let (tw, th) = (40, 30);

        assert_eq!(xy(0, grid, tw, th), (0, th));
        assert_eq!(xy(2, grid, tw, th), (2 * tw, th));
        assert_eq!(xy(3, grid, tw, th), (0, 0));
        assert_eq!(xy(5, grid, tw, th), (2 * tw, 0));
    }

    #[test]
    fn placement_is_a_bijection_onto_tiles() {
        for (rows, cols) in [(1, 1), (1, 5), (4, 1), (3, 4), (6, 8)] {
            let grid = QuiltGrid::new(rows, cols).unwrap();
            let tiles: HashSet<(u32, u32)> = (0..grid.view_count())
                .map(|i| {
                    let p = placement_for(i, grid, 7, 5).unwrap();
                    assert_eq!(p.x % 7, 0);
                    assert_eq!(p.y % 5, 0);
                    assert!(p.column < grid.cols() && p.row < grid.rows());
                    (p.column, p.row)
                })
                .collect();
            assert_eq!(tiles.len(), grid.view_count() as usize);
        }
    }

    #[test]
    fn index_past_the_grid_has_no_placement() {
        let grid = QuiltGrid::new(2, 2).unwrap();
        assert!(placement_for(3, grid, 1, 1).is_some());
        assert!(placement_for(4, grid, 1, 1).is_none());
    }
}
