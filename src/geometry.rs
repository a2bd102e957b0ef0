//! Rectangle arithmetic shared by the layout engine and the X11 backend.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Geometry {
    pub origin: Point,
    pub size: Size,
}

impl Geometry {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Geometry {
        Geometry {
            origin: Point { x, y },
            size: Size { w, h },
        }
    }

    pub fn zero() -> Geometry {
        Geometry::new(0, 0, 0, 0)
    }

    /// Whether the point falls inside this rectangle.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.y >= self.origin.y
            && point.x < self.origin.x + self.size.w as i32
            && point.y < self.origin.y + self.size.h as i32
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Geometry {
        Geometry {
            origin: Point {
                x: self.origin.x + dx,
                y: self.origin.y + dy,
            },
            size: self.size,
        }
    }

    /// Shrinks the rectangle by `px` on every side, saturating at zero size.
    pub fn inset(&self, px: u32) -> Geometry {
        Geometry {
            origin: Point {
                x: self.origin.x + px as i32,
                y: self.origin.y + px as i32,
            },
            size: Size {
                w: self.size.w.saturating_sub(2 * px),
                h: self.size.h.saturating_sub(2 * px),
            },
        }
    }

    /// Removes `px` rows from the top of the rectangle.
    pub fn shave_top(&self, px: u32) -> Geometry {
        Geometry {
            origin: Point {
                x: self.origin.x,
                y: self.origin.y + px as i32,
            },
            size: Size {
                w: self.size.w,
                h: self.size.h.saturating_sub(px),
            },
        }
    }

    pub fn center_in(&self, outer: Geometry) -> Geometry {
        Geometry {
            origin: Point {
                x: outer.origin.x + (outer.size.w.saturating_sub(self.size.w) / 2) as i32,
                y: outer.origin.y + (outer.size.h.saturating_sub(self.size.h) / 2) as i32,
            },
            size: self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let geo = Geometry::new(10, 10, 100, 50);
        assert!(geo.contains(Point { x: 10, y: 10 }));
        assert!(geo.contains(Point { x: 109, y: 59 }));
        assert!(!geo.contains(Point { x: 110, y: 10 }));
        assert!(!geo.contains(Point { x: 10, y: 60 }));
    }

    #[test]
    fn inset_saturates() {
        let geo = Geometry::new(0, 0, 10, 10);
        assert_eq!(geo.inset(20).size, Size { w: 0, h: 0 });
        let geo = Geometry::new(5, 5, 100, 100);
        assert_eq!(geo.inset(2), Geometry::new(7, 7, 96, 96));
    }

    #[test]
    fn translate_round_trips() {
        let geo = Geometry::new(100, 100, 200, 150);
        assert_eq!(geo.translate(1024, 0).translate(-1024, 0), geo);
    }
}
