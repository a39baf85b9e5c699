use std::path::{Path, PathBuf};

use crate::{graph::LineageResult, render::ImageFormat};

/// Where and how lineage documents are written.
///
/// - `output_dir` receives `<file_prefix>.dot` and `<file_prefix>_contracted.dot`.
/// - `image_format` asks the external `dot_command` for images next to them.
/// - `overwrite` allows replacing files left by an earlier run.
/// - `adjacency_list` also writes the JSON adjacency lists.
#[derive(Debug, Clone, PartialEq)]
pub struct LineageConfig {
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub image_format: Option<ImageFormat>,
    pub overwrite: bool,
    pub dot_command: String,
    pub adjacency_list: bool,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            file_prefix: "lineage".to_string(),
            image_format: None,
            overwrite: false,
            dot_command: "dot".to_string(),
            adjacency_list: false,
        }
    }
}

impl LineageConfig {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Request images in `format`; unsupported names fail here, before any
    /// file is touched.
    pub fn with_format(mut self, format: &str) -> LineageResult<Self> {
        self.image_format = Some(format.parse()?);
        Ok(self)
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.file_prefix = prefix.to_string();
        self
    }

    pub fn with_dot_command(mut self, command: &str) -> Self {
        self.dot_command = command.to_string();
        self
    }

    pub fn with_adjacency_list(mut self, enabled: bool) -> Self {
        self.adjacency_list = enabled;
        self
    }

    pub fn document_path(&self, contracted: bool, extension: &str) -> PathBuf {
        let suffix = if contracted { "_contracted" } else { "" };
        self.output_dir.join(format!("{}{}.{}", self.file_prefix, suffix, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::LineageError;

    #[test]
    fn defaults_write_dot_only() {
        let config = LineageConfig::default();
        assert_eq!(config.image_format, None);
        assert!(!config.overwrite);
        assert_eq!(config.document_path(true, "dot"), PathBuf::from("./lineage_contracted.dot"));
    }

    #[test]
    fn unsupported_format_is_rejected_up_front() {
        let err = LineageConfig::new("/tmp/out").with_format("gif").unwrap_err();
        assert!(matches!(err, LineageError::UnsupportedFormat(_)));
    }

    #[test]
    fn builder_style_setters_compose() {
        let config = LineageConfig::new("/tmp/out")
            .with_prefix("flow")
            .with_overwrite(true)
            .with_format("svg")
            .unwrap();
        assert_eq!(config.image_format, Some(ImageFormat::Svg));
        assert_eq!(config.document_path(false, "svg"), PathBuf::from("/tmp/out/flow.svg"));
    }
}
