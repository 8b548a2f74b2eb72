use arrayvec::ArrayVec;
use glam::{ DVec2, DVec3, DVec4, Vec2, Vec3 };
use std::ops::Deref;
use crate::error::{ OrthtreeError, OrthtreeResult };

/// Largest dimensionality an orthtree supports. A node at this
/// dimensionality already has 65536 children.
pub const MAX_DIMENSIONS: usize = 16;

/// A coordinate in D-dimensional space, stored inline.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point(ArrayVec<f64, MAX_DIMENSIONS>);

impl Point {
    pub fn new(coords: &[f64]) -> OrthtreeResult<Self> {
        ArrayVec::try_from(coords)
            .map(Self)
            .map_err(|_| OrthtreeError::TooManyDimensions {
                found: coords.len(),
                max: MAX_DIMENSIONS,
            })
    }

    /// A point with every coordinate set to `value`.
    pub fn splat(dimensions: usize, value: f64) -> OrthtreeResult<Self> {
        if dimensions > MAX_DIMENSIONS {
            return Err(OrthtreeError::TooManyDimensions { found: dimensions, max: MAX_DIMENSIONS });
        }
        Ok(Self((0..dimensions).map(|_| value).collect()))
    }

    #[inline(always)]
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    pub fn coords(&self) -> &[f64] {
        &self.0
    }

    pub fn distance_squared(&self, other: &Point) -> f64 {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub(crate) fn from_fn(dimensions: usize, f: impl FnMut(usize) -> f64) -> Self {
        Self((0..dimensions).map(f).collect())
    }
}

impl Deref for Point {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl TryFrom<&[f64]> for Point {
    type Error = OrthtreeError;

    fn try_from(coords: &[f64]) -> OrthtreeResult<Self> {
        Self::new(coords)
    }
}

macro_rules! impl_from_glam {
    ($($vec:ty),*) => {
        $(
            impl From<$vec> for Point {
                fn from(vec: $vec) -> Self {
                    Self(vec.to_array().into_iter().map(f64::from).collect())
                }
            }
        )*
    };
}

impl_from_glam!(Vec2, Vec3, DVec2, DVec3, DVec4);

#[test]
fn point_from_slice() {
    let point = Point::new(&[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(point.dimensions(), 3);
    assert_eq!(point[1], 2.0);

    let too_long = [0.0; MAX_DIMENSIONS + 1];
    assert_eq!(
        Point::new(&too_long),
        Err(OrthtreeError::TooManyDimensions { found: MAX_DIMENSIONS + 1, max: MAX_DIMENSIONS })
    );
}

#[test]
fn point_from_glam() {
    use glam::{ dvec2, vec3 };

    assert_eq!(Point::from(dvec2(1.0, 2.0)).coords(), &[1.0, 2.0]);
    assert_eq!(Point::from(vec3(1.0, 0.5, -2.0)).coords(), &[1.0, 0.5, -2.0]);
}

#[test]
fn point_distance() {
    use glam::dvec2;

    let a = Point::from(dvec2(0.0, 0.0));
    let b = Point::from(dvec2(3.0, 4.0));
    assert_eq!(a.distance_squared(&b), 25.0);
    assert_eq!(a.distance(&b), 5.0);
}
