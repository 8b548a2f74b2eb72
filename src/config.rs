use crate::{
    error::{ OrthtreeError, OrthtreeResult },
    geometry::{ Region, MAX_DIMENSIONS },
};

/// Construction parameters of an [`OrthtreeIndex`](crate::OrthtreeIndex).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrthtreeConfig {
    /// Region covered by the root node.
    pub bounds: Region,
    /// Number of axes. Must match `bounds`.
    pub dimensions: usize,
    /// Items a leaf holds before it subdivides.
    pub capacity: usize,
    /// Depth at which subdivision stops regardless of capacity.
    pub max_depth: usize,
}

impl OrthtreeConfig {
    /// Config whose dimensionality is taken from `bounds`.
    pub fn new(bounds: Region, capacity: usize, max_depth: usize) -> Self {
        Self {
            dimensions: bounds.dimensions(),
            bounds,
            capacity,
            max_depth,
        }
    }

    pub fn validate(&self) -> OrthtreeResult<()> {
        let invalid = |msg: String| Err(OrthtreeError::InvalidConfiguration(msg));

        if self.dimensions < 1 {
            return invalid("dimensions must be at least 1".to_string());
        }
        if self.dimensions > MAX_DIMENSIONS {
            return invalid(format!("dimensions must be at most {MAX_DIMENSIONS}, got {}", self.dimensions));
        }
        if self.capacity < 1 {
            return invalid("capacity must be at least 1".to_string());
        }
        if self.bounds.dimensions() != self.dimensions {
            return invalid(format!(
                "bounds have {} dimensions, expected {}",
                self.bounds.dimensions(),
                self.dimensions
            ));
        }
        // Regions can arrive without going through Region::new (deserialization)
        if let Err(err) = self.bounds.validate() {
            return invalid(format!("bounds are malformed: {err}"));
        }
        Ok(())
    }
}

#[test]
fn config_validation() {
    use glam::{ dvec2, dvec3 };

    let bounds = Region::new(dvec2(0.0, 0.0).into(), dvec2(100.0, 100.0).into()).unwrap();
    assert!(OrthtreeConfig::new(bounds.clone(), 4, 5).validate().is_ok());
    // max_depth of zero is a tree that never subdivides
    assert!(OrthtreeConfig::new(bounds.clone(), 4, 0).validate().is_ok());

    let config = OrthtreeConfig::new(bounds.clone(), 0, 5);
    assert!(matches!(config.validate(), Err(OrthtreeError::InvalidConfiguration(_))));

    let config = OrthtreeConfig { dimensions: 3, ..OrthtreeConfig::new(bounds, 4, 5) };
    assert!(matches!(config.validate(), Err(OrthtreeError::InvalidConfiguration(_))));

    let flat = Region::from_point(dvec3(1.0, 1.0, 1.0).into());
    let config = OrthtreeConfig { dimensions: 0, ..OrthtreeConfig::new(flat, 4, 5) };
    assert!(matches!(config.validate(), Err(OrthtreeError::InvalidConfiguration(_))));
}
