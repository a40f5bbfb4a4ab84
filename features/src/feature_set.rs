use glam::Vec2;
use crate::error::ValidationError;

/// A detected feature location. Identity is the index inside its [`FeatureSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub position: Vec2,
    pub scale: f32,
    /// Radians.
    pub orientation: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, scale: f32, orientation: f32) -> Self {
        Self {
            position: glam::vec2(x, y),
            scale,
            orientation,
        }
    }
}

/// Keypoints and descriptors extracted from one image.
///
/// `descriptors[i]` describes `keypoints[i]`, and every descriptor holds exactly
/// `descriptor_dim` values. Decoding always yields a set that upholds this;
/// sets built by hand are checked by [`FeatureSet::validate`] before encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub descriptor_dim: u32,
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Vec<f32>>,
}

impl FeatureSet {
    pub fn new(descriptor_dim: u32) -> Self {
        Self {
            descriptor_dim,
            keypoints: Vec::new(),
            descriptors: Vec::new(),
        }
    }

    pub fn with_capacity(descriptor_dim: u32, capacity: usize) -> Self {
        Self {
            descriptor_dim,
            keypoints: Vec::with_capacity(capacity),
            descriptors: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, keypoint: Keypoint, descriptor: Vec<f32>) {
        self.keypoints.push(keypoint);
        self.descriptors.push(descriptor);
    }

    pub fn keypoint_count(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Keypoint, &[f32])> {
        self.keypoints
            .iter()
            .zip(self.descriptors.iter().map(Vec::as_slice))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.descriptor_dim == 0 {
            return Err(ValidationError::ZeroDimension);
        }
        if self.keypoints.len() != self.descriptors.len() {
            return Err(ValidationError::LengthMismatch {
                keypoints: self.keypoints.len(),
                descriptors: self.descriptors.len(),
            });
        }
        if let Some((index, desc)) = self
            .descriptors
            .iter()
            .enumerate()
            .find(|(_, d)| d.len() != self.descriptor_dim as usize)
        {
            return Err(ValidationError::DescriptorLength {
                index,
                len: desc.len(),
                dim: self.descriptor_dim,
            });
        }
        Ok(())
    }
}
