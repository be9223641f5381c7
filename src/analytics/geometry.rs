use crate::buffer::Dimensions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Closed polygon; the last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Axis-aligned rectangle as a four-vertex polygon.
    pub fn rectangle(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new(vec![
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ])
    }

    fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let next = self.points.iter().cycle().skip(1);
        self.points.iter().copied().zip(next.copied())
    }

    /// Twice the signed shoelace area (positive for counter-clockwise in y-up axes).
    /// i128 keeps the full i32 coordinate range exact.
    fn cross_sum(&self) -> i128 {
        self.edges().map(|(a, b)| cross(a, b)).sum()
    }

    pub fn area(&self) -> f64 {
        self.cross_sum().unsigned_abs() as f64 / 2.0
    }

    /// Centroid from the polygon's first moments, truncated toward zero.
    /// Degenerate polygons fall back to their first vertex.
    pub fn centroid(&self) -> Option<Point> {
        let first = *self.points.first()?;

        let mut m00 = 0i128;
        let mut m10 = 0i128;
        let mut m01 = 0i128;
        for (a, b) in self.edges() {
            let c = cross(a, b);
            m00 += c;
            m10 += (a.x as i128 + b.x as i128) * c;
            m01 += (a.y as i128 + b.y as i128) * c;
        }

        if m00 == 0 {
            return Some(first);
        }

        // m10 / m00 here is 3 * (true first moment / true area).
        let denom = 3 * m00;
        Some(Point::new(
            (m10 / denom) as i32,
            (m01 / denom) as i32,
        ))
    }
}

fn cross(a: Point, b: Point) -> i128 {
    a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn of(x: i32, width: u32) -> Self {
        if (x as i64) < (width / 2) as i64 {
            Side::Left
        } else {
            Side::Right
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionDescriptor {
    pub area: f64,
    pub centroid: Point,
    pub side: Side,
}

impl RegionDescriptor {
    pub fn from_polygon(polygon: &Polygon, dims: Dimensions) -> Option<Self> {
        let centroid = polygon.centroid()?;
        Some(Self {
            area: polygon.area(),
            centroid,
            side: Side::of(centroid.x, dims.width),
        })
    }
}

/// Descriptors for every non-empty polygon, in input order.
pub fn describe_regions(polygons: &[Polygon], dims: Dimensions) -> Vec<RegionDescriptor> {
    polygons
        .iter()
        .filter_map(|p| RegionDescriptor::from_polygon(p, dims))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: Dimensions = Dimensions {
        width: 640,
        height: 480,
    };

    fn poly(points: &[(i32, i32)]) -> Polygon {
        Polygon::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    #[test]
    fn test_rectangle_area_and_centroid() {
        let rect = Polygon::rectangle(10, 20, 30, 60);
        assert_eq!(rect.area(), 800.0);
        assert_eq!(rect.centroid(), Some(Point::new(20, 40)));
    }

    #[test]
    fn test_area_ignores_winding() {
        let cw = poly(&[(0, 0), (0, 10), (10, 10), (10, 0)]);
        let ccw = poly(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        assert_eq!(cw.area(), 100.0);
        assert_eq!(ccw.area(), 100.0);
        assert_eq!(cw.centroid(), ccw.centroid());
    }

    #[test]
    fn test_triangle_centroid_truncates() {
        let tri = poly(&[(0, 0), (10, 0), (0, 10)]);
        assert_eq!(tri.area(), 50.0);
        // exact centroid is (3.33, 3.33)
        assert_eq!(tri.centroid(), Some(Point::new(3, 3)));
    }

    #[test]
    fn test_degenerate_centroid_falls_back_to_first_vertex() {
        let coincident = poly(&[(42, 17), (42, 17), (42, 17)]);
        assert_eq!(coincident.area(), 0.0);
        assert_eq!(coincident.centroid(), Some(Point::new(42, 17)));

        let collinear = poly(&[(5, 5), (10, 10), (15, 15)]);
        assert_eq!(collinear.centroid(), Some(Point::new(5, 5)));

        let single = poly(&[(7, 9)]);
        assert_eq!(single.centroid(), Some(Point::new(7, 9)));
    }

    #[test]
    fn test_large_coordinates_stay_exact() {
        let rect = Polygon::rectangle(0, 0, 20_000_000, 20_000_000);
        assert_eq!(rect.area(), 4.0e14);
        assert_eq!(rect.centroid(), Some(Point::new(10_000_000, 10_000_000)));

        let full = Polygon::rectangle(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        // exact centroid is (-0.5, -0.5)
        assert_eq!(full.centroid(), Some(Point::new(0, 0)));
        assert!(full.area() > 1.8e19);
    }

    #[test]
    fn test_empty_polygon_has_no_descriptor() {
        assert_eq!(Polygon::default().centroid(), None);
        assert!(RegionDescriptor::from_polygon(&Polygon::default(), DIMS).is_none());
    }

    #[test]
    fn test_side_split_at_half_width() {
        assert_eq!(Side::of(0, 640), Side::Left);
        assert_eq!(Side::of(319, 640), Side::Left);
        assert_eq!(Side::of(320, 640), Side::Right);
        assert_eq!(Side::of(-5, 640), Side::Left);
        // odd widths use integer division
        assert_eq!(Side::of(2, 5), Side::Right);
    }

    #[test]
    fn test_describe_regions() {
        let polygons = vec![
            Polygon::rectangle(0, 0, 100, 100),
            Polygon::default(),
            Polygon::rectangle(400, 300, 500, 320),
        ];
        let descriptors = describe_regions(&polygons, DIMS);

        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].side, Side::Left);
        assert_eq!(descriptors[0].area, 10_000.0);
        assert_eq!(descriptors[1].side, Side::Right);
        assert_eq!(descriptors[1].centroid, Point::new(450, 310));
    }
}
