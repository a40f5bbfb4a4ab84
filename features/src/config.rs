use serde::{Deserialize, Serialize};

/// Byte order of every integer and float in a feature file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// On-disk representation of a single descriptor value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub enum DescriptorEncoding {
    /// 4-byte IEEE float.
    #[default]
    Float32,
    /// 1 byte per value, integral values 0..=255.
    Quantized8,
}

impl DescriptorEncoding {
    pub fn width(&self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Quantized8 => 1,
        }
    }
}

/// Header and record shape of a feature file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub enum FileLayout {
    /// magic, version, count, dim; records of x, y, scale, orientation.
    #[default]
    Compact,
    /// VisualSFM `.sift`: magic, version, count, words per location, dim;
    /// records of x, y, colour, scale, orientation; end marker.
    Vsfm,
}

impl FileLayout {
    pub fn header_len(&self) -> usize {
        match self {
            Self::Compact => 16,
            Self::Vsfm => 20,
        }
    }

    pub fn record_len(&self) -> usize {
        match self {
            Self::Compact => 16,
            Self::Vsfm => 20,
        }
    }

    /// Value of the header's record size field, counted in 4-byte words.
    pub fn record_words(&self) -> Option<u32> {
        match self {
            Self::Compact => None,
            Self::Vsfm => Some(5),
        }
    }

    pub fn end_marker(&self) -> Option<[u8; 4]> {
        match self {
            Self::Compact => None,
            Self::Vsfm => Some(VSFM_END_MARKER),
        }
    }
}

pub const COMPACT_MAGIC: [u8; 4] = *b"FEAT";
pub const COMPACT_VERSION: u32 = 1;
pub const VSFM_MAGIC: [u8; 4] = *b"SIFT";
pub const VSFM_VERSION: [u8; 4] = *b"V4.0";
pub const VSFM_END_MARKER: [u8; 4] = [0xff, b'E', b'O', b'F'];

/// Everything the codec needs to know about one tool version's feature files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    pub layout: FileLayout,
    pub byte_order: ByteOrder,
    pub descriptor_encoding: DescriptorEncoding,
    pub magic: [u8; 4],
    pub version: u32,
}

impl CodecConfig {
    pub fn compact() -> Self {
        Self {
            layout: FileLayout::Compact,
            byte_order: ByteOrder::Little,
            descriptor_encoding: DescriptorEncoding::Float32,
            magic: COMPACT_MAGIC,
            version: COMPACT_VERSION,
        }
    }

    /// The VisualSFM native layout. Its version tag is four ASCII bytes,
    /// stored here as the little-endian integer they spell.
    pub fn vsfm() -> Self {
        Self {
            layout: FileLayout::Vsfm,
            byte_order: ByteOrder::Little,
            descriptor_encoding: DescriptorEncoding::Quantized8,
            magic: VSFM_MAGIC,
            version: u32::from_le_bytes(VSFM_VERSION),
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_descriptor_encoding(mut self, encoding: DescriptorEncoding) -> Self {
        self.descriptor_encoding = encoding;
        self
    }

    /// Total file size for `count` keypoints of dimension `dim`, or `None` on overflow.
    pub fn file_len(&self, count: usize, dim: usize) -> Option<usize> {
        let records = count.checked_mul(self.layout.record_len())?;
        let descriptors = count
            .checked_mul(dim)?
            .checked_mul(self.descriptor_encoding.width())?;
        let marker = self.layout.end_marker().map_or(0, |m| m.len());
        self.layout
            .header_len()
            .checked_add(records)?
            .checked_add(descriptors)?
            .checked_add(marker)
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::compact()
    }
}
