//! Putative feature matches between image pairs, in the text format the
//! external tool imports:
//!
//! ```text
//! <first image> <second image> <match count>
//! <query indices into the first image's keypoints>
//! <train indices into the second image's keypoints>
//! ```

use std::path::{Path, PathBuf};
use log::info;
use crate::error::{FeatureError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FeatureMatch {
    /// Keypoint index in the first image.
    pub query: usize,
    /// Keypoint index in the second image.
    pub train: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePairMatches {
    pub first: PathBuf,
    pub second: PathBuf,
    pub matches: Vec<FeatureMatch>,
}

pub fn format_matches(pairs: &[ImagePairMatches]) -> Result<String> {
    let mut out = String::new();
    for pair in pairs {
        let first = image_name(&pair.first)?;
        let second = image_name(&pair.second)?;
        let query: Vec<String> = pair.matches.iter().map(|m| m.query.to_string()).collect();
        let train: Vec<String> = pair.matches.iter().map(|m| m.train.to_string()).collect();
        out.push_str(&format!("{first} {second} {}\n", pair.matches.len()));
        out.push_str(&format!("{}\n", query.join(" ")));
        out.push_str(&format!("{}\n", train.join(" ")));
    }
    Ok(out)
}

pub fn parse_matches(text: &str) -> Result<Vec<ImagePairMatches>> {
    let mut pairs = vec![];
    let mut lines = text.lines().enumerate();

    while let Some((line_no, header)) = lines.next() {
        if header.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = header.split_whitespace().collect();
        let [first, second, count] = parts[..] else {
            return Err(invalid(line_no, "expected `<first> <second> <count>`"));
        };
        let count: usize = count
            .parse()
            .map_err(|_| invalid(line_no, "match count is not a number"))?;

        let query = index_line(lines.next(), line_no, count)?;
        let train = index_line(lines.next(), line_no, count)?;

        pairs.push(ImagePairMatches {
            first: PathBuf::from(first),
            second: PathBuf::from(second),
            matches: query
                .into_iter()
                .zip(train)
                .map(|(query, train)| FeatureMatch { query, train })
                .collect(),
        });
    }

    Ok(pairs)
}

pub async fn write_matches_file(path: &Path, pairs: &[ImagePairMatches]) -> Result<()> {
    let text = format_matches(pairs)?;
    info!("Writing {} image pairs to match file {}", pairs.len(), path.display());
    tokio::fs::write(path, text).await?;
    Ok(())
}

fn image_name(path: &Path) -> Result<&str> {
    let name = path
        .to_str()
        .ok_or_else(|| FeatureError::InvalidMatches(format!("{} is not valid UTF-8", path.display())))?;
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(FeatureError::InvalidMatches(format!(
            "image name {name:?} must be non-empty and contain no whitespace"
        )));
    }
    Ok(name)
}

fn index_line(line: Option<(usize, &str)>, header_no: usize, count: usize) -> Result<Vec<usize>> {
    let Some((line_no, line)) = line else {
        return Err(invalid(header_no, "pair is missing its index lines"));
    };
    let indices = line
        .split_whitespace()
        .map(|s| s.parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| invalid(line_no, "index is not a number"))?;
    if indices.len() != count {
        return Err(invalid(line_no, "index count differs from declared match count"));
    }
    Ok(indices)
}

fn invalid(line_no: usize, reason: &str) -> FeatureError {
    FeatureError::InvalidMatches(format!("line {}: {reason}", line_no + 1))
}
