//! Tiling layouts. A layout only computes regions: applying them (and size
//! hints) to clients is up to the caller.
use std::fmt;

use crate::geometry::Rectangle;

/// How a monitor's work area is split between its tiled clients
pub trait Layout: fmt::Debug {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// `count` regions inside `area`, in client list order. `main_views` is
    /// how many clients the user wants in the main area; layouts without a
    /// main area ignore it.
    fn arrange(&self, area: Rectangle, count: usize, main_views: usize) -> Vec<Rectangle>;
}

/// Evenly sized side by side columns. The last column takes the pixels left
/// over by the division.
#[derive(Debug, Default, Clone, Copy)]
pub struct Columns;

impl Layout for Columns {
    fn name(&self) -> &'static str {
        "columns"
    }

    fn arrange(&self, area: Rectangle, count: usize, _main_views: usize) -> Vec<Rectangle> {
        if count == 0 {
            return vec![];
        }
        let (x, y, w, h) = area.values();
        let n = count as u32;
        let width = w / n;
        (0..n)
            .map(|i| {
                let w = if i == n - 1 { w - width * (n - 1) } else { width };
                Rectangle::new(x + (width * i) as i32, y, w, h)
            })
            .collect()
    }
}

/// Every client gets the whole work area
#[derive(Debug, Default, Clone, Copy)]
pub struct Monocle;

impl Layout for Monocle {
    fn name(&self) -> &'static str {
        "monocle"
    }

    fn arrange(&self, area: Rectangle, count: usize, _main_views: usize) -> Vec<Rectangle> {
        vec![area; count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_cover_the_area() {
        let area = Rectangle::new(10, 20, 1000, 500);
        let regions = Columns.arrange(area, 3, 1);
        assert_eq!(
            regions,
            vec![
                Rectangle::new(10, 20, 333, 500),
                Rectangle::new(343, 20, 333, 500),
                Rectangle::new(676, 20, 334, 500),
            ]
        );
    }

    #[test]
    fn no_clients_no_regions() {
        assert!(Columns.arrange(Rectangle::new(0, 0, 10, 10), 0, 1).is_empty());
        assert!(Monocle.arrange(Rectangle::new(0, 0, 10, 10), 0, 1).is_empty());
    }
}
