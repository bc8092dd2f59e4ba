use anyhow::{Result, anyhow};

/// Where to move a window to
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// An X window / screen position: top left corner + extent
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Rectangle {
    /// Absolute x coordinate of the top left corner
    pub x: i32,
    /// Absolute y coordinate of the top left corner
    pub y: i32,
    /// Width in pixels
    pub w: u32,
    /// Height in pixels
    pub h: u32,
}

impl Rectangle {
    /// Create a new Rectangle.
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
        Rectangle { x, y, w, h }
    }

    /// Destructure this Rectangle into its component values (x, y, w, h).
    pub fn values(&self) -> (i32, i32, u32, u32) {
        (self.x, self.y, self.w, self.h)
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && i64::from(x) < i64::from(self.x) + i64::from(self.w)
            && i64::from(y) < i64::from(self.y) + i64::from(self.h)
    }

    /// The same rectangle `step` pixels further in `direction`
    pub fn moved(&self, direction: Direction, step: u32) -> Rectangle {
        let step = step as i32;
        let (dx, dy) = match direction {
            Direction::Up => (0, -step),
            Direction::Down => (0, step),
            Direction::Left => (-step, 0),
            Direction::Right => (step, 0),
        };
        Rectangle::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Grow (or shrink, for negative values) the extent, keeping the top
    /// left corner. The result is never smaller than 1x1.
    pub fn resized(&self, dw: i32, dh: i32) -> Rectangle {
        let grow = |v: u32, d: i32| {
            (i64::from(v) + i64::from(d))
                .max(1)
                .min(i64::from(u32::MAX)) as u32
        };
        Rectangle::new(self.x, self.y, grow(self.w, dw), grow(self.h, dh))
    }

    /// The part of this rectangle left over once every edge of `strut` has been
    /// reserved. Never goes below a zero sized rectangle.
    pub fn shrink(&self, strut: &Strut) -> Rectangle {
        let w = self.w.saturating_sub(strut.left).saturating_sub(strut.right);
        let h = self.h.saturating_sub(strut.top).saturating_sub(strut.bottom);
        Rectangle {
            x: self.x + strut.left.min(self.w) as i32,
            y: self.y + strut.top.min(self.h) as i32,
            w,
            h,
        }
    }
}

/// Screen edge space reserved by a window (panels, docks...)
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Strut {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Strut {
    pub fn new(left: u32, right: u32, top: u32, bottom: u32) -> Strut {
        Strut { left, right, top, bottom }
    }

    /// Decode a _NET_WM_STRUT (4 words) or _NET_WM_STRUT_PARTIAL (12 words) value.
    /// Only the first four words matter to us: left, right, top, bottom.
    pub fn from_raw(raw: &[u32]) -> Result<Strut> {
        match raw {
            [left, right, top, bottom, ..] => Ok(Strut::new(*left, *right, *top, *bottom)),
            _ => Err(anyhow!("strut needs 4 values, got {}", raw.len())),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Strut::default()
    }

    /// Combine two struts edge by edge, keeping the larger reservation.
    pub fn union(self, other: Strut) -> Strut {
        Strut {
            left: self.left.max(other.left),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_and_resizing() {
        let r = Rectangle::new(10, 10, 100, 50);
        assert_eq!(r.moved(Direction::Left, 20), Rectangle::new(-10, 10, 100, 50));
        assert_eq!(r.moved(Direction::Down, 5), Rectangle::new(10, 15, 100, 50));
        assert_eq!(r.resized(20, -10), Rectangle::new(10, 10, 120, 40));
        assert_eq!(r.resized(-500, 0), Rectangle::new(10, 10, 1, 50));
    }

    #[test]
    fn shrink_removes_every_edge() {
        let screen = Rectangle::new(0, 0, 1920, 1080);
        let r = screen.shrink(&Strut::new(10, 20, 30, 40));
        assert_eq!(r, Rectangle::new(10, 30, 1890, 1010));
    }

    #[test]
    fn shrink_saturates_on_oversized_struts() {
        let r = Rectangle::new(100, 0, 50, 50).shrink(&Strut::new(80, 0, 0, 60));
        assert_eq!(r.w, 0);
        assert_eq!(r.h, 0);
        assert_eq!(r.x, 150);
    }

    #[test]
    fn strut_union_keeps_largest_edges() {
        let bar = Strut::new(0, 0, 18, 0);
        let dock = Strut::new(48, 0, 0, 10);
        assert_eq!(bar.union(dock), Strut::new(48, 0, 18, 10));
        assert!(Strut::default().is_empty());
    }

    #[test]
    fn strut_from_partial_blob() {
        let raw = [0, 0, 24, 0, 0, 0, 0, 0, 0, 1919, 0, 0];
        assert_eq!(Strut::from_raw(&raw).unwrap(), Strut::new(0, 0, 24, 0));
        assert!(Strut::from_raw(&[1, 2]).is_err());
    }

    #[test]
    fn contains_point_excludes_far_edges() {
        let r = Rectangle::new(1920, 0, 1280, 1024);
        assert!(r.contains_point(1920, 0));
        assert!(r.contains_point(3199, 1023));
        assert!(!r.contains_point(3200, 10));
        assert!(!r.contains_point(1919, 10));
    }
}
