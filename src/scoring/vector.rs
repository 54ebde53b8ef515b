//! Feature Vector - Core data structure for predictor input
//!
//! Versioned feature vector with layout validation. Owned by the scoring
//! call that produced it; never persisted by the core.

use serde::{Deserialize, Serialize};

use super::layout::{
    layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT,
    FEATURE_VERSION,
};

/// Versioned feature vector
///
/// Always carries the layout version and hash so parameter sets trained
/// against a different schema can be rejected at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    pub values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    /// Create a new zeroed feature vector with current version
    pub fn new() -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values: [0.0; FEATURE_COUNT],
        }
    }

    /// Create from raw values with current version
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Get values as slice
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f32> {
        super::layout::feature_index(name).and_then(|i| self.get(i))
    }

    /// Set feature by index
    pub fn set(&mut self, index: usize, value: f32) {
        if index < FEATURE_COUNT {
            self.values[index] = value;
        }
    }

    /// Set feature by name; returns false for unknown names
    pub fn set_by_name(&mut self, name: &str, value: f32) -> bool {
        if let Some(index) = super::layout::feature_index(name) {
            self.set(index, value);
            true
        } else {
            false
        }
    }

    /// Validate that this vector is compatible with the current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    /// Feature names for this vector
    pub fn feature_names(&self) -> &'static [&'static str] {
        FEATURE_LAYOUT
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[f32; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f32; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_new() {
        let vector = FeatureVector::new();
        assert_eq!(vector.version, FEATURE_VERSION);
        assert_eq!(vector.layout_hash, layout_hash());
        assert_eq!(vector.values.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_set_and_get_by_name() {
        let mut vector = FeatureVector::new();
        assert!(vector.set_by_name("amount", 42.0));
        assert_eq!(vector.get_by_name("amount"), Some(42.0));

        assert!(!vector.set_by_name("nonexistent", 0.0));
        assert_eq!(vector.get_by_name("nonexistent"), None);
    }

    #[test]
    fn test_validation() {
        let vector = FeatureVector::new();
        assert!(vector.validate().is_ok());

        let stale = FeatureVector {
            version: FEATURE_VERSION + 1,
            ..FeatureVector::new()
        };
        assert!(stale.validate().is_err());
    }
}
