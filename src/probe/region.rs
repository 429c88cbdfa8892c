//! Screen regions and the damage containment test.

/// Axis-aligned region in screen coordinates, matching the X11 rectangle
/// encoding (signed origin, unsigned extent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub fn new(x: i16, y: i16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// Strict full containment: `other` is accepted only when all four of
    /// its edges lie on or inside this rectangle's edges. Partial overlap is
    /// rejected, not clipped. Arithmetic is widened to i32 so edge sums
    /// cannot wrap.
    pub fn contains(&self, other: &Rect) -> bool {
        let (sx, sy) = (i32::from(self.x), i32::from(self.y));
        let (ox, oy) = (i32::from(other.x), i32::from(other.y));

        ox >= sx
            && oy >= sy
            && ox + i32::from(other.width) <= sx + i32::from(self.width)
            && oy + i32::from(other.height) <= sy + i32::from(self.height)
    }
}
