use crate::{
    error::{ OrthtreeError, OrthtreeResult },
    utils,
};
use super::{ OrthantIndex, Point, Shape };

/// An axis-aligned hyper-rectangle. Both faces are inclusive.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    min: Point,
    max: Point,
}

impl Region {
    pub fn new(min: Point, max: Point) -> OrthtreeResult<Self> {
        let region = Self { min, max };
        region.validate()?;
        Ok(region)
    }

    /// Skips validation, the way deserialization does.
    #[cfg(test)]
    pub(crate) fn unchecked(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Zero-volume region covering a single point.
    pub fn from_point(point: Point) -> Self {
        Self {
            min: point.clone(),
            max: point,
        }
    }

    /// Region centered on `center` extending `half_extent` along every axis.
    pub fn from_center(center: &Point, half_extent: f64) -> OrthtreeResult<Self> {
        Self::new(
            Point::from_fn(center.dimensions(), |axis| center[axis] - half_extent),
            Point::from_fn(center.dimensions(), |axis| center[axis] + half_extent),
        )
    }

    /// Checks that both corners agree on dimensionality and that
    /// min <= max on every axis. NaN coordinates fail the check.
    pub fn validate(&self) -> OrthtreeResult<()> {
        if self.min.dimensions() != self.max.dimensions() {
            return Err(OrthtreeError::DimensionMismatch {
                expected: self.min.dimensions(),
                found: self.max.dimensions(),
            });
        }
        match self.min.iter().zip(self.max.iter()).position(|(min, max)| !(min <= max)) {
            Some(axis) => Err(OrthtreeError::InvalidRegion { axis }),
            None => Ok(()),
        }
    }

    #[inline(always)]
    pub fn min(&self) -> &Point {
        &self.min
    }

    #[inline(always)]
    pub fn max(&self) -> &Point {
        &self.max
    }

    #[inline(always)]
    pub fn dimensions(&self) -> usize {
        self.min.dimensions()
    }

    pub fn size(&self) -> Point {
        Point::from_fn(self.dimensions(), |axis| self.max[axis] - self.min[axis])
    }

    pub fn center(&self) -> Point {
        Point::from_fn(self.dimensions(), |axis| utils::midpoint(self.min[axis], self.max[axis]))
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.iter()
            .zip(self.min.iter().zip(self.max.iter()))
            .all(|(value, (min, max))| value >= min && value <= max)
    }

    pub fn contains_region(&self, other: &Region) -> bool {
        self.contains_span(&other.min, &other.max)
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.intersects_span(&other.min, &other.max)
    }

    pub fn contains_shape(&self, shape: &Shape) -> bool {
        self.contains_span(shape.lower(), shape.upper())
    }

    pub fn intersects_shape(&self, shape: &Shape) -> bool {
        self.intersects_span(shape.lower(), shape.upper())
    }

    /// Squared distance from `point` to the nearest point of this region.
    pub fn distance_squared(&self, point: &Point) -> f64 {
        point.iter()
            .zip(self.min.iter().zip(self.max.iter()))
            .map(|(value, (min, max))| utils::interval_distance_squared(*value, *min, *max))
            .sum()
    }

    fn contains_span(&self, lower: &Point, upper: &Point) -> bool {
        (0..self.dimensions()).all(|axis| lower[axis] >= self.min[axis] && upper[axis] <= self.max[axis])
    }

    fn intersects_span(&self, lower: &Point, upper: &Point) -> bool {
        (0..self.dimensions()).all(|axis| lower[axis] <= self.max[axis] && upper[axis] >= self.min[axis])
    }

    /// The sub-region covered by one child after splitting at every axis midpoint.
    pub fn orthant(&self, orthant: OrthantIndex) -> Region {
        let dims = self.dimensions();
        let mid = self.center();
        Region {
            min: Point::from_fn(dims, |axis| {
                if orthant.is_upper(axis) { mid[axis] } else { self.min[axis] }
            }),
            max: Point::from_fn(dims, |axis| {
                if orthant.is_upper(axis) { self.max[axis] } else { mid[axis] }
            }),
        }
    }

    /// Splits the region into its 2^D children, in orthant index order.
    pub fn subdivide(&self) -> Vec<Region> {
        OrthantIndex::all(self.dimensions()).map(|orthant| self.orthant(orthant)).collect()
    }

    /// The single child orthant that fully contains `shape`, if any.
    ///
    /// A shape touching the midpoint from above belongs to the upper half,
    /// so a point lying exactly on a split plane always has a home.
    pub fn orthant_containing(&self, shape: &Shape) -> Option<OrthantIndex> {
        if !self.contains_shape(shape) {
            return None;
        }

        let (lower, upper) = (shape.lower(), shape.upper());
        let mut orthant = OrthantIndex::default();
        for axis in 0..self.dimensions() {
            let mid = utils::midpoint(self.min[axis], self.max[axis]);
            if lower[axis] >= mid {
                orthant.set_upper(axis, true);
            } else if upper[axis] > mid {
                // Straddles the split plane
                return None;
            }
        }
        Some(orthant)
    }
}

#[cfg(test)]
fn region2(min: (f64, f64), max: (f64, f64)) -> Region {
    use glam::dvec2;
    Region::new(dvec2(min.0, min.1).into(), dvec2(max.0, max.1).into()).unwrap()
}

#[test]
fn region_validation() {
    use glam::dvec2;

    assert!(Region::new(dvec2(0.0, 0.0).into(), dvec2(1.0, 1.0).into()).is_ok());
    assert_eq!(
        Region::new(dvec2(0.0, 5.0).into(), dvec2(1.0, 1.0).into()),
        Err(OrthtreeError::InvalidRegion { axis: 1 })
    );
    assert_eq!(
        Region::new(dvec2(f64::NAN, 0.0).into(), dvec2(1.0, 1.0).into()),
        Err(OrthtreeError::InvalidRegion { axis: 0 })
    );
    assert_eq!(
        Region::new(dvec2(0.0, 0.0).into(), Point::new(&[1.0, 1.0, 1.0]).unwrap()),
        Err(OrthtreeError::DimensionMismatch { expected: 2, found: 3 })
    );
}

#[test]
fn region_intersection() {
    let a = region2((0.0, 0.0), (10.0, 10.0));
    assert!(a.intersects(&region2((5.0, 5.0), (15.0, 15.0))));
    // Touching faces count as intersecting
    assert!(a.intersects(&region2((10.0, 0.0), (20.0, 10.0))));
    assert!(!a.intersects(&region2((10.5, 0.0), (20.0, 10.0))));
    assert!(a.contains_region(&region2((1.0, 1.0), (10.0, 10.0))));
    assert!(!a.contains_region(&region2((1.0, 1.0), (11.0, 10.0))));
}

#[test]
fn region_subdivide() {
    let region = region2((0.0, 0.0), (100.0, 50.0));
    let children = region.subdivide();
    assert_eq!(children.len(), 4);
    assert_eq!(children[0], region2((0.0, 0.0), (50.0, 25.0)));
    assert_eq!(children[1], region2((50.0, 0.0), (100.0, 25.0)));
    assert_eq!(children[2], region2((0.0, 25.0), (50.0, 50.0)));
    assert_eq!(children[3], region2((50.0, 25.0), (100.0, 50.0)));
}

#[test]
fn region_orthant_routing() {
    use glam::dvec2;

    let region = region2((0.0, 0.0), (100.0, 100.0));
    let point = |x, y| Shape::Point(dvec2(x, y).into());

    assert_eq!(region.orthant_containing(&point(1.0, 1.0)).map(|o| o.index()), Some(0));
    assert_eq!(region.orthant_containing(&point(75.0, 1.0)).map(|o| o.index()), Some(1));
    // On the split plane goes up
    assert_eq!(region.orthant_containing(&point(50.0, 50.0)).map(|o| o.index()), Some(3));
    assert_eq!(region.orthant_containing(&point(101.0, 1.0)), None);

    let spanning = Shape::Region(region2((40.0, 10.0), (60.0, 20.0)));
    assert_eq!(region.orthant_containing(&spanning), None);
    let touching = Shape::Region(region2((40.0, 10.0), (50.0, 20.0)));
    assert_eq!(region.orthant_containing(&touching).map(|o| o.index()), Some(0));
}

#[test]
fn region_distance() {
    use glam::dvec2;

    let region = region2((0.0, 0.0), (10.0, 10.0));
    assert_eq!(region.distance_squared(&dvec2(5.0, 5.0).into()), 0.0);
    assert_eq!(region.distance_squared(&dvec2(13.0, 14.0).into()), 25.0);
    assert_eq!(region.distance_squared(&dvec2(-1.0, 5.0).into()), 1.0);
}
