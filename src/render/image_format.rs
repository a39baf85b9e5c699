use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::graph::LineageError;

/// Image formats the external `dot` tool is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Svg,
    Jpg,
    Pdf,
}

impl ImageFormat {
    pub const SUPPORTED: [&'static str; 4] = ["png", "svg", "jpg", "pdf"];

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            "pdf" => Ok(ImageFormat::Pdf),
            _ => Err(LineageError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
