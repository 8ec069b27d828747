use crate::error::ModelError;

/// Valid input value range `[min, max]` of a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    /// Creates bounds; both ends must be finite with `min < max`.
    pub fn new(min: f64, max: f64) -> Result<Self, ModelError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(ModelError::Configuration(format!(
                "invalid bounds ({}, {}): expected finite min < max",
                min, max
            )));
        }
        Ok(Bounds { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_validation() {
        let b = Bounds::new(0.0, 255.0).unwrap();
        assert_eq!((b.min(), b.max()), (0.0, 255.0));
        assert!(b.contains(0.0) && b.contains(255.0) && !b.contains(256.0));
        assert!(Bounds::new(1.0, 1.0).is_err());
        assert!(Bounds::new(2.0, 1.0).is_err());
        assert!(Bounds::new(0.0, f64::INFINITY).is_err());
        assert!(Bounds::new(f64::NAN, 1.0).is_err());
    }
}
