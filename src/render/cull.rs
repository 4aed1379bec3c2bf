use crate::spatial::{world_to_cell, CellBounds, GridCoord};
use macroquad::prelude::*;

const CULL_MARGIN_CELLS: i32 = 1;

/// Cells intersecting a world rectangle, padded by one cell on every side.
pub fn visible_cells(view: Rect, cell_size: u32) -> CellBounds {
    let mut min = world_to_cell(vec2(view.x, view.y), cell_size);
    let mut max = world_to_cell(vec2(view.x + view.w, view.y + view.h), cell_size);

    if min.x > max.x {
        std::mem::swap(&mut min.x, &mut max.x);
    }
    if min.y > max.y {
        std::mem::swap(&mut min.y, &mut max.y);
    }

    CellBounds {
        min: GridCoord::new(min.x - CULL_MARGIN_CELLS, min.y - CULL_MARGIN_CELLS),
        max: GridCoord::new(max.x + CULL_MARGIN_CELLS, max.y + CULL_MARGIN_CELLS),
    }
}

/// Grid line positions covering a view: start snapped down to a cell edge,
/// running one cell past the far edge.
pub fn grid_lines(view: Rect, cell_size: u32) -> (Vec<f32>, Vec<f32>) {
    let s = cell_size as f32;
    let start_x = (view.x / s).floor() * s;
    let start_y = (view.y / s).floor() * s;
    let end_x = start_x + view.w + s;
    let end_y = start_y + view.h + s;

    let xs = (0..)
        .map(|i| start_x + i as f32 * s)
        .take_while(|x| *x < end_x)
        .collect();
    let ys = (0..)
        .map(|i| start_y + i as f32 * s)
        .take_while(|y| *y < end_y)
        .collect();
    (xs, ys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_cells_pad_by_one() {
        let b = visible_cells(Rect::new(0.0, 0.0, 128.0, 64.0), 64);
        assert_eq!(b.min, GridCoord::new(-1, -1));
        assert_eq!(b.max, GridCoord::new(3, 2));
    }

    #[test]
    fn grid_lines_snap_to_cell_edges() {
        let (xs, ys) = grid_lines(Rect::new(-70.0, 10.0, 200.0, 100.0), 64);
        assert_eq!(xs.first(), Some(&-128.0));
        assert!(xs.windows(2).all(|w| w[1] - w[0] == 64.0));
        assert!(*xs.last().unwrap() < -128.0 + 200.0 + 64.0);
        assert_eq!(ys.first(), Some(&0.0));
        assert_eq!(ys.len(), 3);
    }
}
