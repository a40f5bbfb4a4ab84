use std::io::{self, Cursor, Read, Write};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use crate::config::{ByteOrder, CodecConfig, DescriptorEncoding, FileLayout};
use crate::error::{FormatError, ValidationError};
use crate::feature_set::{FeatureSet, Keypoint};

/// Parses a complete feature file held in memory.
///
/// The declared header is checked against the buffer length before any table
/// is read, so a file is either accepted whole or rejected.
pub fn decode(bytes: &[u8], config: &CodecConfig) -> Result<FeatureSet, FormatError> {
    let header_len = config.layout.header_len();
    if bytes.len() < header_len {
        return Err(FormatError::TruncatedHeader {
            expected: header_len,
            actual: bytes.len(),
        });
    }

    match config.byte_order {
        ByteOrder::Little => decode_with::<LittleEndian>(bytes, config),
        ByteOrder::Big => decode_with::<BigEndian>(bytes, config),
    }
}

fn decode_with<E: byteorder::ByteOrder>(bytes: &[u8], config: &CodecConfig) -> Result<FeatureSet, FormatError> {
    let layout = config.layout;
    let mut reader = Cursor::new(bytes);
    let short_header = |_: io::Error| FormatError::TruncatedHeader {
        expected: layout.header_len(),
        actual: bytes.len(),
    };

    let mut magic = [0; 4];
    reader.read_exact(&mut magic).map_err(short_header)?;
    if magic != config.magic {
        return Err(FormatError::BadMagic { expected: config.magic, found: magic });
    }
    let version = reader.read_u32::<E>().map_err(short_header)?;
    if version != config.version {
        return Err(FormatError::UnsupportedVersion { expected: config.version, found: version });
    }
    let count = reader.read_u32::<E>().map_err(short_header)?;
    if let Some(expected) = layout.record_words() {
        let found = reader.read_u32::<E>().map_err(short_header)?;
        if found != expected {
            return Err(FormatError::RecordSize { expected, found });
        }
    }
    let dim = reader.read_u32::<E>().map_err(short_header)?;
    if dim == 0 {
        return Err(FormatError::ZeroDimension);
    }

    let expected = config
        .file_len(count as usize, dim as usize)
        .ok_or(FormatError::SizeOverflow { count, dim })?;
    if bytes.len() < expected {
        return Err(FormatError::Truncated { expected, actual: bytes.len() });
    }
    if bytes.len() > expected {
        return Err(FormatError::TrailingBytes { extra: bytes.len() - expected });
    }
    debug!("Decoding {count} keypoints of dimension {dim}");

    let short = |_: io::Error| FormatError::Truncated { expected, actual: bytes.len() };
    let mut features = FeatureSet::with_capacity(dim, count as usize);
    for _ in 0..count {
        let x = reader.read_f32::<E>().map_err(short)?;
        let y = reader.read_f32::<E>().map_err(short)?;
        if layout == FileLayout::Vsfm {
            // Colour is not part of the model.
            reader.read_u32::<E>().map_err(short)?;
        }
        let scale = reader.read_f32::<E>().map_err(short)?;
        let orientation = reader.read_f32::<E>().map_err(short)?;
        features.keypoints.push(Keypoint::new(x, y, scale, orientation));
    }

    for _ in 0..count {
        let mut descriptor = Vec::with_capacity(dim as usize);
        for _ in 0..dim {
            descriptor.push(match config.descriptor_encoding {
                DescriptorEncoding::Float32 => reader.read_f32::<E>().map_err(short)?,
                DescriptorEncoding::Quantized8 => reader.read_u8().map_err(short)? as f32,
            });
        }
        features.descriptors.push(descriptor);
    }

    if let Some(marker) = layout.end_marker() {
        let mut found = [0; 4];
        reader.read_exact(&mut found).map_err(short)?;
        if found != marker {
            return Err(FormatError::MissingEndMarker);
        }
    }

    Ok(features)
}

/// Serializes a feature set. Identical input always yields identical bytes.
pub fn encode(features: &FeatureSet, config: &CodecConfig) -> Result<Vec<u8>, ValidationError> {
    features.validate()?;
    let count = u32::try_from(features.keypoint_count())
        .map_err(|_| ValidationError::TooManyKeypoints(features.keypoint_count()))?;

    if config.descriptor_encoding == DescriptorEncoding::Quantized8 {
        for (index, descriptor) in features.descriptors.iter().enumerate() {
            if let Some(&value) = descriptor.iter().find(|v| !is_quantizable(**v)) {
                return Err(ValidationError::NotQuantizable { index, value });
            }
        }
    }

    let len = config
        .file_len(count as usize, features.descriptor_dim as usize)
        .ok_or(ValidationError::TooManyKeypoints(features.keypoint_count()))?;
    let mut buf = Vec::with_capacity(len);
    let written = match config.byte_order {
        ByteOrder::Little => encode_with::<LittleEndian, _>(&mut buf, features, count, config),
        ByteOrder::Big => encode_with::<BigEndian, _>(&mut buf, features, count, config),
    };
    written.map_err(|err| ValidationError::Write(err.to_string()))?;

    debug!("Encoded {count} keypoints into {} bytes", buf.len());
    Ok(buf)
}

fn encode_with<E: byteorder::ByteOrder, W: Write>(
    writer: &mut W,
    features: &FeatureSet,
    count: u32,
    config: &CodecConfig,
) -> io::Result<()> {
    writer.write_all(&config.magic)?;
    writer.write_u32::<E>(config.version)?;
    writer.write_u32::<E>(count)?;
    if let Some(words) = config.layout.record_words() {
        writer.write_u32::<E>(words)?;
    }
    writer.write_u32::<E>(features.descriptor_dim)?;

    for keypoint in &features.keypoints {
        writer.write_f32::<E>(keypoint.position.x)?;
        writer.write_f32::<E>(keypoint.position.y)?;
        if config.layout == FileLayout::Vsfm {
            writer.write_u32::<E>(0)?;
        }
        writer.write_f32::<E>(keypoint.scale)?;
        writer.write_f32::<E>(keypoint.orientation)?;
    }

    for descriptor in &features.descriptors {
        for &value in descriptor {
            match config.descriptor_encoding {
                DescriptorEncoding::Float32 => writer.write_f32::<E>(value)?,
                DescriptorEncoding::Quantized8 => writer.write_u8(value as u8)?,
            }
        }
    }

    if let Some(marker) = config.layout.end_marker() {
        writer.write_all(&marker)?;
    }
    Ok(())
}

fn is_quantizable(value: f32) -> bool {
    value.fract() == 0.0 && (0.0..=255.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_configs() -> Vec<CodecConfig> {
        let mut configs = vec![];
        for layout_config in [CodecConfig::compact(), CodecConfig::vsfm()] {
            for order in [ByteOrder::Little, ByteOrder::Big] {
                for encoding in [DescriptorEncoding::Float32, DescriptorEncoding::Quantized8] {
                    configs.push(
                        layout_config
                            .clone()
                            .with_byte_order(order)
                            .with_descriptor_encoding(encoding),
                    );
                }
            }
        }
        configs
    }

    fn two_keypoints() -> FeatureSet {
        let mut set = FeatureSet::new(4);
        set.push(Keypoint::new(12.5, 340.25, 1.75, 0.5), vec![0.0, 17.0, 255.0, 3.0]);
        set.push(Keypoint::new(-3.0, 1e4, 12.0, -2.25), vec![128.0, 1.0, 2.0, 64.0]);
        set
    }

    #[test]
    fn empty_set_is_header_only() {
        let set = FeatureSet::new(128);
        let bytes = encode(&set, &CodecConfig::compact()).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], b"FEAT");
        assert_eq!(&bytes[8..12], &0u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &128u32.to_le_bytes());

        let decoded = decode(&bytes, &CodecConfig::compact()).unwrap();
        assert_eq!(decoded.keypoint_count(), 0);
        assert_eq!(decoded.descriptor_dim, 128);
        assert!(decoded.keypoints.is_empty());
        assert!(decoded.descriptors.is_empty());
    }

    #[test]
    fn round_trip_every_configuration() {
        for config in all_configs() {
            for set in [FeatureSet::new(128), two_keypoints()] {
                let bytes = encode(&set, &config).unwrap();
                assert_eq!(bytes.len(), config.file_len(set.keypoint_count(), set.descriptor_dim as usize).unwrap());
                let decoded = decode(&bytes, &config).unwrap();
                assert_eq!(decoded, set, "config {config:?}");
            }
        }
    }

    #[test]
    fn two_keypoints_reproduce_exact_values() {
        let set = two_keypoints();
        let decoded = decode(&encode(&set, &CodecConfig::compact()).unwrap(), &CodecConfig::compact()).unwrap();
        assert_eq!(decoded.keypoint_count(), 2);
        assert_eq!(decoded.keypoints[0].position, glam::vec2(12.5, 340.25));
        assert_eq!(decoded.keypoints[1].orientation, -2.25);
        assert_eq!(decoded.descriptors[1], vec![128.0, 1.0, 2.0, 64.0]);
    }

    #[test]
    fn encoding_is_deterministic() {
        let config = CodecConfig::vsfm();
        let set = two_keypoints();
        assert_eq!(encode(&set, &config).unwrap(), encode(&set.clone(), &config).unwrap());
    }

    #[test]
    fn byte_order_is_applied_to_every_field() {
        let set = two_keypoints();
        let le = encode(&set, &CodecConfig::compact()).unwrap();
        let be = encode(&set, &CodecConfig::compact().with_byte_order(ByteOrder::Big)).unwrap();
        assert_eq!(&le[0..4], &be[0..4]);
        assert_eq!(&be[8..12], &[0, 0, 0, 2]);
        assert_eq!(&le[16..20], &12.5f32.to_le_bytes());
        assert_eq!(&be[16..20], &12.5f32.to_be_bytes());
    }

    #[test]
    fn vsfm_layout_matches_tool_files() {
        let bytes = encode(&two_keypoints(), &CodecConfig::vsfm()).unwrap();
        assert_eq!(&bytes[0..8], b"SIFTV4.0");
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &5u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &4u32.to_le_bytes());
        // colour slot of the first location
        assert_eq!(&bytes[28..32], &[0; 4]);
        // first quantized descriptor
        assert_eq!(&bytes[60..64], &[0, 17, 255, 3]);
        assert_eq!(&bytes[bytes.len() - 4..], &[0xff, b'E', b'O', b'F']);
    }

    #[test]
    fn rejects_corrupted_magic() {
        let mut bytes = encode(&two_keypoints(), &CodecConfig::compact()).unwrap();
        bytes[1] = b'X';
        assert!(matches!(
            decode(&bytes, &CodecConfig::compact()),
            Err(FormatError::BadMagic { .. })
        ));
    }

    #[test]
    fn rejects_truncated_tables() {
        let bytes = encode(&two_keypoints(), &CodecConfig::compact()).unwrap();
        let short = &bytes[..bytes.len() - 1];
        assert_eq!(
            decode(short, &CodecConfig::compact()),
            Err(FormatError::Truncated { expected: bytes.len(), actual: bytes.len() - 1 })
        );
        assert!(matches!(
            decode(&bytes[..10], &CodecConfig::compact()),
            Err(FormatError::TruncatedHeader { .. })
        ));
    }

    #[test]
    fn rejects_trailing_garbage() {
        for config in [CodecConfig::compact(), CodecConfig::vsfm()] {
            let mut bytes = encode(&two_keypoints(), &config).unwrap();
            bytes.extend_from_slice(&[1, 2, 3]);
            assert_eq!(decode(&bytes, &config), Err(FormatError::TrailingBytes { extra: 3 }));
        }
    }

    #[test]
    fn rejects_count_overrunning_buffer() {
        let mut bytes = encode(&FeatureSet::new(128), &CodecConfig::compact()).unwrap();
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            decode(&bytes, &CodecConfig::compact()),
            Err(FormatError::Truncated { .. } | FormatError::SizeOverflow { .. })
        ));
    }

    #[test]
    fn rejects_bad_vsfm_record_size_and_marker() {
        let config = CodecConfig::vsfm();
        let bytes = encode(&two_keypoints(), &config).unwrap();

        let mut bad_record = bytes.clone();
        bad_record[12..16].copy_from_slice(&7u32.to_le_bytes());
        assert_eq!(decode(&bad_record, &config), Err(FormatError::RecordSize { expected: 5, found: 7 }));

        let mut bad_marker = bytes;
        let last = bad_marker.len() - 1;
        bad_marker[last] = b'X';
        assert_eq!(decode(&bad_marker, &config), Err(FormatError::MissingEndMarker));
    }

    #[test]
    fn rejects_other_versions_and_zero_dimension() {
        let config = CodecConfig::compact();
        let mut bytes = encode(&FeatureSet::new(8), &config).unwrap();
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(decode(&bytes, &config), Err(FormatError::UnsupportedVersion { found: 2, .. })));

        let mut bytes = encode(&FeatureSet::new(8), &config).unwrap();
        bytes[12..16].copy_from_slice(&0u32.to_le_bytes());
        assert_eq!(decode(&bytes, &config), Err(FormatError::ZeroDimension));
    }

    #[test]
    fn decodes_big_endian_file_written_field_by_field() {
        let mut bytes = b"FEAT".to_vec();
        for word in [1u32, 1, 2] {
            bytes.write_u32::<BigEndian>(word).unwrap();
        }
        for value in [4.0f32, -8.5, 2.0, 0.25, 1.0, 255.0] {
            bytes.write_f32::<BigEndian>(value).unwrap();
        }

        let config = CodecConfig::compact().with_byte_order(ByteOrder::Big);
        let decoded = decode(&bytes, &config).unwrap();
        assert_eq!(decoded.keypoints, vec![Keypoint::new(4.0, -8.5, 2.0, 0.25)]);
        assert_eq!(decoded.descriptors, vec![vec![1.0, 255.0]]);
        assert_eq!(encode(&decoded, &config).unwrap(), bytes);
    }

    #[test]
    fn decoding_with_wrong_byte_order_fails() {
        let bytes = encode(&two_keypoints(), &CodecConfig::compact()).unwrap();
        let big = CodecConfig::compact().with_byte_order(ByteOrder::Big);
        assert!(decode(&bytes, &big).is_err());
    }

    #[test]
    fn encode_rejects_invalid_sets() {
        let config = CodecConfig::compact();

        let mut mismatched = two_keypoints();
        mismatched.descriptors.pop();
        assert_eq!(
            encode(&mismatched, &config),
            Err(ValidationError::LengthMismatch { keypoints: 2, descriptors: 1 })
        );

        let mut wrong_dim = two_keypoints();
        wrong_dim.descriptors[0].push(1.0);
        assert_eq!(
            encode(&wrong_dim, &config),
            Err(ValidationError::DescriptorLength { index: 0, len: 5, dim: 4 })
        );
    }

    #[test]
    fn quantized_encoding_rejects_fractional_values() {
        let mut set = two_keypoints();
        set.descriptors[1][2] = 0.5;
        assert_eq!(
            encode(&set, &CodecConfig::vsfm()),
            Err(ValidationError::NotQuantizable { index: 1, value: 0.5 })
        );
        set.descriptors[1][2] = 256.0;
        assert!(encode(&set, &CodecConfig::vsfm()).is_err());
        assert!(encode(&set, &CodecConfig::compact()).is_ok());
    }
}
