//! Dash splitting.
//!
//! Cuts flattened contours into the "on" pieces of a dash pattern. The
//! pattern alternates dash and gap lengths, an odd-length pattern is
//! repeated once to make it even, and every contour restarts the pattern
//! at `offset`.

use crate::basics::PointD;
use crate::vector_path::Contour;

/// Normalised dash pattern, or `None` when it draws a solid line.
fn normalize(pattern: &[f64]) -> Option<Vec<f64>> {
    if pattern.is_empty() || pattern.iter().any(|d| !d.is_finite() || *d < 0.0) {
        return None;
    }
    if pattern.iter().all(|d| *d == 0.0) {
        return None;
    }
    let mut dashes = pattern.to_vec();
    if dashes.len() % 2 == 1 {
        dashes.extend_from_slice(pattern);
    }
    Some(dashes)
}

struct DashCursor<'a> {
    dashes: &'a [f64],
    index: usize,
    /// Distance left in the current dash or gap.
    rest: f64,
}

impl<'a> DashCursor<'a> {
    fn new(dashes: &'a [f64], offset: f64) -> Self {
        let total: f64 = dashes.iter().sum();
        let mut phase = if offset.is_finite() {
            offset.rem_euclid(total)
        } else {
            0.0
        };
        let mut index = 0;
        while phase >= dashes[index] && phase > 0.0 {
            phase -= dashes[index];
            index = (index + 1) % dashes.len();
        }
        Self {
            dashes,
            index,
            rest: dashes[index] - phase,
        }
    }

    #[inline]
    fn is_on(&self) -> bool {
        self.index % 2 == 0
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % self.dashes.len();
        self.rest = self.dashes[self.index];
    }
}

fn dash_contour(c: &Contour, dashes: &[f64], offset: f64, out: &mut Vec<Contour>) {
    let mut pts = c.points.clone();
    if c.closed {
        if let Some(&first) = pts.first() {
            pts.push(first);
        }
    }
    if pts.len() < 2 {
        return;
    }

    let mut cur = DashCursor::new(dashes, offset);
    let mut piece = Contour::default();
    if cur.is_on() {
        piece.points.push(pts[0]);
    }

    for seg in pts.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        let len = a.distance(&b);
        let mut pos = 0.0;
        while len - pos > cur.rest {
            pos += cur.rest;
            let t = pos / len;
            let p = PointD::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
            // Ends the current dash, or starts the next one.
            piece.points.push(p);
            if cur.is_on() {
                out.push(std::mem::take(&mut piece));
            }
            cur.advance();
        }
        cur.rest -= len - pos;
        if cur.is_on() {
            piece.points.push(b);
        }
    }
    if cur.is_on() && piece.points.len() > 1 {
        out.push(piece);
    }
}

/// Split `contours` along `pattern`. Returns the contours unchanged when the
/// pattern is empty, all zero, or contains negative or non-finite entries.
pub fn dash_path(contours: &[Contour], pattern: &[f64], offset: f64) -> Vec<Contour> {
    let Some(dashes) = normalize(pattern) else {
        return contours.to_vec();
    };
    let mut out = Vec::new();
    for c in contours {
        dash_contour(c, &dashes, offset, &mut out);
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
