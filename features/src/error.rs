use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, FeatureError>;

/// A feature file that does not match the declared layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Buffer too short for header: need {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    #[error("Bad magic signature {found:?}, expected {expected:?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("Unsupported version {found:#010x}, expected {expected:#010x}")]
    UnsupportedVersion { expected: u32, found: u32 },

    #[error("Descriptor dimension must be positive")]
    ZeroDimension,

    #[error("Keypoint record size {found} does not match layout ({expected})")]
    RecordSize { expected: u32, found: u32 },

    #[error("Declared layout size overflows (count {count}, dimension {dim})")]
    SizeOverflow { count: u32, dim: u32 },

    #[error("Declared layout needs {expected} bytes, buffer has {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("{extra} trailing bytes beyond the declared layout")]
    TrailingBytes { extra: usize },

    #[error("Missing end-of-file marker")]
    MissingEndMarker,
}

/// A feature set that cannot be encoded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{keypoints} keypoints but {descriptors} descriptors")]
    LengthMismatch { keypoints: usize, descriptors: usize },

    #[error("Descriptor {index} has {len} values, expected {dim}")]
    DescriptorLength { index: usize, len: usize, dim: u32 },

    #[error("Descriptor dimension must be positive")]
    ZeroDimension,

    #[error("Too many keypoints for the file header: {0}")]
    TooManyKeypoints(usize),

    #[error("Descriptor {index} value {value} is not representable as a quantized byte")]
    NotQuantizable { index: usize, value: f32 },

    #[error("Could not write feature buffer: {0}")]
    Write(String),
}

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("File IO error: {0}")]
    Io(#[from] tokio::io::Error),

    #[error("Malformed feature file: {0}")]
    Format(#[from] FormatError),

    #[error("Invalid feature set: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid match list: {0}")]
    InvalidMatches(String),
}
