//! Path commands fed to the scan converter.
//!
//! A `Path` is a flat list of segment commands in user space. Coordinates
//! are `f32`; the scan converter adds an integer translation and converts
//! to fixed point itself.

/// One path command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    /// Control point, then end point.
    QuadTo(f32, f32, f32, f32),
    /// Two control points, then end point.
    CubicTo(f32, f32, f32, f32, f32, f32),
    Close,
}

impl PathSegment {
    /// End point of the segment, if it has one.
    pub fn end_point(&self) -> Option<(f32, f32)> {
        match *self {
            PathSegment::MoveTo(x, y) | PathSegment::LineTo(x, y) => Some((x, y)),
            PathSegment::QuadTo(_, _, x, y) => Some((x, y)),
            PathSegment::CubicTo(_, _, _, _, x, y) => Some((x, y)),
            PathSegment::Close => None,
        }
    }
}

/// Ordered list of path commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.segments.push(PathSegment::MoveTo(x, y));
        self
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.segments.push(PathSegment::LineTo(x, y));
        self
    }

    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) -> &mut Self {
        self.segments.push(PathSegment::QuadTo(cx, cy, x, y));
        self
    }

    pub fn cubic_to(
        &mut self,
        c1x: f32,
        c1y: f32,
        c2x: f32,
        c2y: f32,
        x: f32,
        y: f32,
    ) -> &mut Self {
        self.segments
            .push(PathSegment::CubicTo(c1x, c1y, c2x, c2y, x, y));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.segments.push(PathSegment::Close);
        self
    }

    /// A polyline through `points`, closed when `closed` is set.
    pub fn polygon(points: &[(f32, f32)], closed: bool) -> Self {
        let mut path = Self::new();
        let mut it = points.iter();
        if let Some(&(x, y)) = it.next() {
            path.move_to(x, y);
            for &(x, y) in it {
                path.line_to(x, y);
            }
            if closed {
                path.close();
            }
        }
        path
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathSegment;
    type IntoIter = std::slice::Iter<'a, PathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0)
            .line_to(10.0, 0.0)
            .quad_to(10.0, 10.0, 0.0, 10.0)
            .close();
        assert_eq!(p.len(), 4);
        assert_eq!(p.segments()[2].end_point(), Some((0.0, 10.0)));
        assert_eq!(p.segments()[3].end_point(), None);
    }

    #[test]
    fn test_polygon_helper() {
        let p = Path::polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)], true);
        assert_eq!(
            p.segments(),
            &[
                PathSegment::MoveTo(0.0, 0.0),
                PathSegment::LineTo(4.0, 0.0),
                PathSegment::LineTo(4.0, 4.0),
                PathSegment::Close,
            ]
        );
        assert!(Path::polygon(&[], true).is_empty());
    }
}
