use super::{ Point, Region };

/// The extent an item is stored under.
///
/// Points are treated as zero-volume regions by every routing and
/// intersection test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    Point(Point),
    Region(Region),
}

impl Shape {
    /// Lowest corner of the shape's envelope.
    #[inline]
    pub fn lower(&self) -> &Point {
        match self {
            Shape::Point(point) => point,
            Shape::Region(region) => region.min(),
        }
    }

    /// Highest corner of the shape's envelope.
    #[inline]
    pub fn upper(&self) -> &Point {
        match self {
            Shape::Point(point) => point,
            Shape::Region(region) => region.max(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.lower().dimensions()
    }

    pub fn as_point(&self) -> Option<&Point> {
        match self {
            Shape::Point(point) => Some(point),
            Shape::Region(_) => None,
        }
    }

    pub fn as_region(&self) -> Option<&Region> {
        match self {
            Shape::Point(_) => None,
            Shape::Region(region) => Some(region),
        }
    }

    pub fn envelope(&self) -> Region {
        match self {
            Shape::Point(point) => Region::from_point(point.clone()),
            Shape::Region(region) => region.clone(),
        }
    }

    /// Squared distance from `point` to the closest part of the shape.
    pub fn distance_squared(&self, point: &Point) -> f64 {
        match self {
            Shape::Point(own) => own.distance_squared(point),
            Shape::Region(region) => region.distance_squared(point),
        }
    }
}

impl From<Point> for Shape {
    fn from(point: Point) -> Self {
        Shape::Point(point)
    }
}

impl From<Region> for Shape {
    fn from(region: Region) -> Self {
        Shape::Region(region)
    }
}

#[test]
fn shape_envelope() {
    use glam::dvec2;

    let point = Shape::from(Point::from(dvec2(2.0, 3.0)));
    assert_eq!(point.lower(), point.upper());
    assert!(point.envelope().is_degenerate());
    assert_eq!(point.dimensions(), 2);

    let region = Region::new(dvec2(0.0, 0.0).into(), dvec2(4.0, 4.0).into()).unwrap();
    let shape = Shape::from(region.clone());
    assert_eq!(shape.as_region(), Some(&region));
    assert_eq!(shape.distance_squared(&dvec2(2.0, 7.0).into()), 9.0);
    assert_eq!(point.distance_squared(&dvec2(2.0, 7.0).into()), 16.0);
}
