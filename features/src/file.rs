use std::path::Path;
use log::info;
use crate::codec::{decode, encode};
use crate::config::CodecConfig;
use crate::error::Result;
use crate::feature_set::FeatureSet;

pub async fn read_feature_file(path: &Path, config: &CodecConfig) -> Result<FeatureSet> {
    info!("Reading feature file {}", path.display());
    let bytes = tokio::fs::read(path).await?;
    Ok(decode(&bytes, config)?)
}

/// Encodes before touching the filesystem, so an invalid set never leaves a
/// partial file behind.
pub async fn write_feature_file(path: &Path, features: &FeatureSet, config: &CodecConfig) -> Result<()> {
    let bytes = encode(features, config)?;
    info!(
        "Writing {} keypoints to feature file {}",
        features.keypoint_count(),
        path.display()
    );
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FeatureError, FormatError};
    use crate::feature_set::Keypoint;

    #[tokio::test]
    async fn write_then_read_feature_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_0001.sift");
        let config = CodecConfig::vsfm();

        let mut set = FeatureSet::new(128);
        set.push(Keypoint::new(10.0, 20.0, 2.0, 1.0), vec![3.0; 128]);
        write_feature_file(&path, &set, &config).await.unwrap();

        let read = read_feature_file(&path, &config).await.unwrap();
        assert_eq!(read, set);
    }

    #[tokio::test]
    async fn invalid_set_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.sift");
        let mut set = FeatureSet::new(4);
        set.keypoints.push(Keypoint::new(0.0, 0.0, 1.0, 0.0));

        let err = write_feature_file(&path, &set, &CodecConfig::compact()).await.unwrap_err();
        assert!(matches!(err, FeatureError::Validation(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.sift");
        tokio::fs::write(&path, b"not a feature file at all").await.unwrap();

        let err = read_feature_file(&path, &CodecConfig::compact()).await.unwrap_err();
        assert!(matches!(err, FeatureError::Format(FormatError::BadMagic { .. })));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_feature_file(&dir.path().join("nope.sift"), &CodecConfig::compact())
            .await
            .unwrap_err();
        assert!(matches!(err, FeatureError::Io(_)));
    }
}
