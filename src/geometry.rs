//! Screen-space primitives shared by the popup and input modules.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, point: Point) -> bool {
        let dx = i64::from(point.x) - i64::from(self.x);
        let dy = i64::from(point.y) - i64::from(self.y);
        dx >= 0 && dy >= 0 && dx < i64::from(self.width) && dy < i64::from(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let bounds = Bounds::new(10, 20, 100, 50);
        assert!(bounds.contains(Point::new(10, 20)));
        assert!(bounds.contains(Point::new(109, 69)));
        assert!(!bounds.contains(Point::new(110, 20)));
        assert!(!bounds.contains(Point::new(10, 70)));
        assert!(!bounds.contains(Point::new(9, 30)));
    }

    #[test]
    fn empty_bounds_contain_nothing() {
        assert!(!Bounds::new(0, 0, 0, 0).contains(Point::new(0, 0)));
    }
}
