use crate::protocol::Cell;

/// Cells on the digital line from `start` to `end`, both included, in order.
///
/// Integer Bresenham stepping: horizontal and vertical drags give straight
/// runs, a 45 degree drag advances one cell on both axes per step.
pub fn cells_between(start: Cell, end: Cell) -> Vec<Cell> {
    let dx = (end.x - start.x).abs();
    let dy = (end.y - start.y).abs();
    let sx = if start.x < end.x { 1 } else { -1 };
    let sy = if start.y < end.y { 1 } else { -1 };

    let mut cells = Vec::with_capacity((dx.max(dy) + 1) as usize);
    let (mut x, mut y) = (start.x, start.y);
    let mut err = dx - dy;

    loop {
        cells.push(Cell::new(x, y));
        if x == end.x && y == end.y {
            break;
        }
        let e2 = err * 2;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cell() {
        assert_eq!(cells_between(Cell::new(2, 2), Cell::new(2, 2)), vec![Cell::new(2, 2)]);
    }

    #[test]
    fn horizontal_run_backwards() {
        let cells = cells_between(Cell::new(3, 0), Cell::new(0, 0));
        assert_eq!(
            cells,
            vec![Cell::new(3, 0), Cell::new(2, 0), Cell::new(1, 0), Cell::new(0, 0)]
        );
    }

    #[test]
    fn vertical_run() {
        let cells = cells_between(Cell::new(0, 0), Cell::new(0, 3));
        assert_eq!(cells.len(), 4);
        assert!(cells.iter().all(|c| c.x == 0));
    }

    #[test]
    fn diagonal_staircase() {
        let cells = cells_between(Cell::new(0, 0), Cell::new(3, 3));
        assert_eq!(
            cells,
            vec![Cell::new(0, 0), Cell::new(1, 1), Cell::new(2, 2), Cell::new(3, 3)]
        );
    }

    #[test]
    fn shallow_line_steps_at_most_one_per_axis() {
        let cells = cells_between(Cell::new(0, 0), Cell::new(7, -2));
        assert_eq!(cells.first(), Some(&Cell::new(0, 0)));
        assert_eq!(cells.last(), Some(&Cell::new(7, -2)));
        assert_eq!(cells.len(), 8);
        for pair in cells.windows(2) {
            assert!((pair[1].x - pair[0].x).abs() <= 1);
            assert!((pair[1].y - pair[0].y).abs() <= 1);
        }
    }
}
