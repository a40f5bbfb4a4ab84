mod codec;
mod config;
mod error;
mod feature_set;
mod file;
pub mod matches;

pub use codec::{decode, encode};
pub use config::{ByteOrder, CodecConfig, DescriptorEncoding, FileLayout};
pub use error::{FeatureError, FormatError, ValidationError};
pub use feature_set::{FeatureSet, Keypoint};
pub use file::{read_feature_file, write_feature_file};
