//! Path geometry: sections, bounding box, and curve flattening.

use crate::error::PsError;
use crate::utils::{itransform_pt, Matrix, Point, Rect};
use smallvec::SmallVec;

/// One section of a path. Coordinates are in device space, except for the
/// recorded start point of a `Closepath`, which is the subpath start in
/// user space (NaN when it could not be determined). Consumers must treat
/// NaN coordinates as absent.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSection {
    /// Starts a new subpath.
    Moveto { x: f64, y: f64 },
    /// Straight segment from the current point.
    Lineto { x: f64, y: f64 },
    /// Cubic Bezier segment with two control points and an endpoint.
    Curveto {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
    },
    /// Returns to the most recent Moveto's point.
    Closepath { x: f64, y: f64 },
}

impl PathSection {
    /// The position this section leaves the pen at, or `None` when the
    /// section carries no usable coordinate.
    pub fn device_coor(&self) -> Option<Point> {
        let (x, y) = match self {
            Self::Moveto { x, y } | Self::Lineto { x, y } | Self::Closepath { x, y } => (*x, *y),
            Self::Curveto { x3, y3, .. } => (*x3, *y3),
        };
        if x.is_nan() || y.is_nan() {
            None
        } else {
            Some((x, y))
        }
    }

    /// All coordinate pairs carried by this section.
    fn pairs(&self) -> SmallVec<[Point; 3]> {
        match self {
            Self::Moveto { x, y } | Self::Lineto { x, y } | Self::Closepath { x, y } => {
                SmallVec::from_slice(&[(*x, *y)])
            }
            Self::Curveto {
                x1,
                y1,
                x2,
                y2,
                x3,
                y3,
            } => SmallVec::from_slice(&[(*x1, *y1), (*x2, *y2), (*x3, *y3)]),
        }
    }
}

/// An ordered sequence of path sections, owned by one graphics state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    sections: Vec<PathSection>,
}

/// Sample count for the dense polyline a curve is expanded into before the
/// sparse subset is selected.
const FLATTEN_SAMPLES: usize = 10_000;

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[PathSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }

    /// Appends a moveto. A moveto directly after another moveto replaces it
    /// instead of accumulating an empty subpath.
    pub fn moveto(&mut self, x: f64, y: f64) {
        if let Some(PathSection::Moveto { .. }) = self.sections.last() {
            self.sections.pop();
        }
        self.sections.push(PathSection::Moveto { x, y });
    }

    pub fn lineto(&mut self, x: f64, y: f64) {
        self.sections.push(PathSection::Lineto { x, y });
    }

    pub fn curveto(&mut self, control1: Point, control2: Point, end: Point) {
        self.sections.push(PathSection::Curveto {
            x1: control1.0,
            y1: control1.1,
            x2: control2.0,
            y2: control2.1,
            x3: end.0,
            y3: end.1,
        });
    }

    /// Closes the current subpath. Idempotent: a no-op on an empty path or a
    /// path already ending in a moveto. Returns the recorded subpath start
    /// in user space (un-transformed through the CTM), when one was found.
    pub fn closepath(&mut self, ctm: Matrix) -> Result<Option<Point>, PsError> {
        if self.sections.is_empty() {
            return Ok(None);
        }
        if let Some(PathSection::Moveto { .. }) = self.sections.last() {
            return Ok(None);
        }

        let mut position = (f64::NAN, f64::NAN);
        for section in self.sections.iter().rev() {
            if let PathSection::Moveto { x, y } = section {
                position = itransform_pt(ctm, (*x, *y))?;
                break;
            }
        }
        self.sections.push(PathSection::Closepath {
            x: position.0,
            y: position.1,
        });
        Ok(Some(position))
    }

    /// The current point in device space, derived by scanning backward for
    /// the last section with valid coordinates.
    pub fn current_point(&self) -> Option<Point> {
        self.sections.iter().rev().find_map(|s| s.device_coor())
    }

    /// Bounding box over all drawn geometry, in device space.
    ///
    /// A trailing moveto on a path with more than one section denotes the
    /// start of an empty subpath and is excluded. Coordinate pairs holding
    /// the NaN sentinel are skipped. An empty path has no current point.
    pub fn bbox(&self) -> Result<Rect, PsError> {
        let nr = self.sections.len();
        if nr < 1 {
            return Err(PsError::NoCurrentPoint);
        }

        let mut bbox = (
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for (i, section) in self.sections.iter().enumerate() {
            if nr > 1 && i == nr - 1 && matches!(section, PathSection::Moveto { .. }) {
                break;
            }
            for (x, y) in section.pairs() {
                if x.is_nan() || y.is_nan() {
                    break;
                }
                bbox.0 = bbox.0.min(x);
                bbox.1 = bbox.1.min(y);
                bbox.2 = bbox.2.max(x);
                bbox.3 = bbox.3.max(y);
            }
        }
        Ok(bbox)
    }

    /// Returns a flattened copy of this path: every curve is replaced by a
    /// polyline whose deviation from the true curve stays within
    /// `max_error` (device space). The path itself is not changed.
    pub fn flatten(&self, max_error: f64) -> Path {
        let mut flat = Path::new();
        let mut last_coor = (f64::NAN, f64::NAN);
        for section in &self.sections {
            match section {
                PathSection::Moveto { x, y } => flat.moveto(*x, *y),
                PathSection::Lineto { x, y } => flat.lineto(*x, *y),
                // The recorded start point still holds for the flattened
                // subpath; keep the section as-is.
                PathSection::Closepath { .. } => flat.sections.push(section.clone()),
                PathSection::Curveto { .. } => {
                    flatten_curve(section, last_coor, max_error, &mut flat)
                }
            }
            last_coor = section.device_coor().unwrap_or((f64::NAN, f64::NAN));
        }
        flat
    }
}

/// Expands one cubic Bezier into a dense sampled polyline, then greedily
/// selects the sparsest subset of samples such that no skipped sample
/// deviates from the chord between the flanking selected samples by more
/// than `max_error`.
fn flatten_curve(section: &PathSection, start: Point, max_error: f64, out: &mut Path) {
    let PathSection::Curveto {
        x1,
        y1,
        x2,
        y2,
        x3,
        y3,
    } = *section
    else {
        return;
    };
    let (x0, y0) = start;

    // Standard cubic coefficient expansion relative to the start point.
    let cx = 3.0 * (x1 - x0);
    let cy = 3.0 * (y1 - y0);
    let bx = 3.0 * (x2 - x1) - cx;
    let by = 3.0 * (y2 - y1) - cy;
    let ax = x3 - x0 - cx - bx;
    let ay = y3 - y0 - cy - by;

    let nr = FLATTEN_SAMPLES;
    let step = 1.0 / (nr as f64 - 1.0);
    let mut x = Vec::with_capacity(nr);
    let mut y = Vec::with_capacity(nr);
    for i in 0..nr {
        let t = i as f64 * step;
        x.push(((ax * t + bx) * t + cx) * t + x0);
        y.push(((ay * t + by) * t + cy) * t + y0);
    }

    // Binary-search frontier between the last accepted sample and the far
    // end: grow the window while the chord stays within the error bound,
    // shrink it when it does not, and accept a vertex when the window
    // collapses to a single step that still exceeds the bound.
    let mut last_plotted = 0usize;
    let mut upper = nr - 1;
    let mut lower = 2usize;
    while lower < nr - 1 {
        let current = (lower + upper + 1) / 2;

        let px = x[current];
        let py = y[current];
        let qx = x[last_plotted];
        let qy = y[last_plotted];
        let dp2 = (px - qx).powi(2) + (py - qy).powi(2);

        let mut max_so_far = 0.0f64;
        for j in last_plotted + 1..current {
            let sx = x[j];
            let sy = y[j];
            let d = if dp2 == 0.0 {
                ((sx - px).powi(2) + (sy - py).powi(2)).sqrt()
            } else {
                let u = ((sx - px) * (qx - px) + (sy - py) * (qy - py)) / dp2;
                let mx = px + u * (qx - px);
                let my = py + u * (qy - py);
                ((mx - sx).powi(2) + (my - sy).powi(2)).sqrt()
            };
            max_so_far = max_so_far.max(d);
        }

        if max_so_far > max_error {
            upper = current;
        } else {
            lower = current;
        }

        if lower + 1 == upper && max_so_far > max_error {
            last_plotted = lower;
            out.lineto(x[last_plotted], y[last_plotted]);
            lower += 1;
            upper = nr - 1;
        }
    }
    out.lineto(x[nr - 1], y[nr - 1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MATRIX_IDENTITY;

    #[test]
    fn moveto_collapses_trailing_moveto() {
        let mut path = Path::new();
        path.moveto(0.0, 0.0);
        path.moveto(5.0, 5.0);
        assert_eq!(path.len(), 1);
        assert_eq!(path.sections()[0], PathSection::Moveto { x: 5.0, y: 5.0 });
    }

    #[test]
    fn closepath_is_idempotent() {
        let mut path = Path::new();
        path.moveto(0.0, 0.0);
        path.lineto(10.0, 0.0);
        path.closepath(MATRIX_IDENTITY).unwrap();
        let once = path.clone();
        path.closepath(MATRIX_IDENTITY).unwrap();
        assert_eq!(path, once);

        // Empty path: also a no-op.
        let mut empty = Path::new();
        empty.closepath(MATRIX_IDENTITY).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn bbox_of_square() {
        let mut path = Path::new();
        path.moveto(0.0, 0.0);
        path.lineto(10.0, 0.0);
        path.lineto(10.0, 10.0);
        path.closepath(MATRIX_IDENTITY).unwrap();
        assert_eq!(path.bbox().unwrap(), (0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn bbox_skips_trailing_moveto() {
        let mut path = Path::new();
        path.moveto(0.0, 0.0);
        path.lineto(4.0, 4.0);
        path.moveto(100.0, 100.0);
        assert_eq!(path.bbox().unwrap(), (0.0, 0.0, 4.0, 4.0));
    }

    #[test]
    fn bbox_of_empty_path_is_nocurrentpoint() {
        assert_eq!(Path::new().bbox().unwrap_err(), PsError::NoCurrentPoint);
    }

    #[test]
    fn current_point_scans_backward() {
        let mut path = Path::new();
        assert_eq!(path.current_point(), None);
        path.moveto(1.0, 2.0);
        path.lineto(3.0, 4.0);
        assert_eq!(path.current_point(), Some((3.0, 4.0)));
    }

    fn curve_point(start: Point, c1: Point, c2: Point, end: Point, t: f64) -> Point {
        let mt = 1.0 - t;
        let x = mt.powi(3) * start.0
            + 3.0 * mt.powi(2) * t * c1.0
            + 3.0 * mt * t.powi(2) * c2.0
            + t.powi(3) * end.0;
        let y = mt.powi(3) * start.1
            + 3.0 * mt.powi(2) * t * c1.1
            + 3.0 * mt * t.powi(2) * c2.1
            + t.powi(3) * end.1;
        (x, y)
    }

    fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
        let len2 = (b.0 - a.0).powi(2) + (b.1 - a.1).powi(2);
        if len2 == 0.0 {
            return ((p.0 - a.0).powi(2) + (p.1 - a.1).powi(2)).sqrt();
        }
        let u = (((p.0 - a.0) * (b.0 - a.0)) + ((p.1 - a.1) * (b.1 - a.1))) / len2;
        let u = u.clamp(0.0, 1.0);
        let mx = a.0 + u * (b.0 - a.0);
        let my = a.1 + u * (b.1 - a.1);
        ((mx - p.0).powi(2) + (my - p.1).powi(2)).sqrt()
    }

    #[test]
    fn flattening_respects_error_bound() {
        let start = (0.0, 0.0);
        let c1 = (25.0, 90.0);
        let c2 = (75.0, -60.0);
        let end = (100.0, 10.0);
        let max_error = 0.5;

        let mut path = Path::new();
        path.moveto(start.0, start.1);
        path.curveto(c1, c2, end);
        let flat = path.flatten(max_error);

        // Collect polyline vertices.
        let mut vertices = Vec::new();
        for section in flat.sections() {
            match section {
                PathSection::Moveto { x, y } | PathSection::Lineto { x, y } => {
                    vertices.push((*x, *y))
                }
                other => panic!("unexpected section in flattened curve: {other:?}"),
            }
        }
        assert!(vertices.len() >= 3, "curve should need several segments");
        assert_eq!(*vertices.last().unwrap(), end);

        // Every point on the true curve must lie within max_error of the
        // nearest polyline segment. The slack covers the gap between this
        // test grid and the dense sample grid the algorithm verified
        // against.
        let slack = 0.05;
        for i in 0..=1000 {
            let t = i as f64 / 1000.0;
            let p = curve_point(start, c1, c2, end, t);
            let best = vertices
                .windows(2)
                .map(|w| distance_to_segment(p, w[0], w[1]))
                .fold(f64::INFINITY, f64::min);
            assert!(
                best <= max_error + slack,
                "curve point at t={t} deviates {best} > {max_error}"
            );
        }
    }

    #[test]
    fn flattening_passes_lines_through() {
        let mut path = Path::new();
        path.moveto(0.0, 0.0);
        path.lineto(5.0, 5.0);
        path.closepath(MATRIX_IDENTITY).unwrap();
        let flat = path.flatten(0.1);
        assert_eq!(flat.sections(), path.sections());
    }
}
