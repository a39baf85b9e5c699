use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, info, warn};

use crate::{
    graph::{LineageError, LineageResult},
    render::{ImageFormat, LineageConfig},
};

/// Files produced by one `OutputWriter::write` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrittenOutput {
    pub files: Vec<PathBuf>,
    pub images: Vec<PathBuf>,
    /// True when an image was requested but the renderer was not available.
    pub skipped_images: bool,
}

/// Rendered documents for one lineage build.
#[derive(Debug, Clone)]
pub struct LineageDocuments {
    pub full_dot: String,
    pub contracted_dot: String,
    pub full_json: Option<String>,
    pub contracted_json: Option<String>,
}

pub struct OutputWriter<'a> {
    config: &'a LineageConfig,
}

impl<'a> OutputWriter<'a> {
    pub fn new(config: &'a LineageConfig) -> Self {
        Self { config }
    }

    /// Write both DOT documents (and the JSON lists when present), then hand
    /// each DOT file to the external renderer if an image was requested.
    ///
    /// Every destination is checked before the first byte is written.
    pub fn write(&self, documents: &LineageDocuments) -> LineageResult<WrittenOutput> {
        let mut targets: Vec<(PathBuf, &str)> = vec![
            (self.config.document_path(false, "dot"), documents.full_dot.as_str()),
            (self.config.document_path(true, "dot"), documents.contracted_dot.as_str()),
        ];
        if let Some(json) = &documents.full_json {
            targets.push((self.config.document_path(false, "json"), json.as_str()));
        }
        if let Some(json) = &documents.contracted_json {
            targets.push((self.config.document_path(true, "json"), json.as_str()));
        }

        let images: Vec<(PathBuf, PathBuf)> = match self.config.image_format {
            Some(format) => [false, true]
                .into_iter()
                .map(|contracted| {
                    (
                        self.config.document_path(contracted, "dot"),
                        self.config.document_path(contracted, format.extension()),
                    )
                })
                .collect(),
            None => Vec::new(),
        };

        let destinations = targets.iter().map(|(p, _)| p).chain(images.iter().map(|(_, p)| p));
        self.ensure_writable(destinations)?;

        fs::create_dir_all(&self.config.output_dir)?;
        let mut output = WrittenOutput::default();
        for (path, contents) in targets {
            fs::write(&path, contents)?;
            info!(path = %path.display(), "wrote lineage document");
            output.files.push(path);
        }

        if let Some(format) = self.config.image_format {
            match self.probe_renderer() {
                Ok(()) => {
                    for (source, target) in images {
                        self.render_image(format, &source, &target)?;
                        info!(path = %target.display(), "rendered lineage image");
                        output.images.push(target);
                    }
                }
                Err(LineageError::ExternalToolUnavailable(reason)) => {
                    warn!(tool = %self.config.dot_command, %reason, "renderer not available, skipping images");
                    output.skipped_images = true;
                }
                Err(other) => return Err(other),
            }
        }

        Ok(output)
    }

    fn ensure_writable<'p>(&self, destinations: impl Iterator<Item = &'p PathBuf>) -> LineageResult<()> {
        if self.config.overwrite {
            return Ok(());
        }
        for path in destinations {
            if path.exists() {
                return Err(LineageError::DestinationExists(path.clone()));
            }
        }
        Ok(())
    }

    /// Run `<dot> -V`; a missing executable is `ExternalToolUnavailable`.
    pub fn probe_renderer(&self) -> LineageResult<()> {
        match Command::new(&self.config.dot_command).arg("-V").output() {
            Ok(out) if out.status.success() => {
                debug!(tool = %self.config.dot_command, "renderer available");
                Ok(())
            }
            Ok(out) => Err(LineageError::ExternalToolUnavailable(format!(
                "`{} -V` exited with {}",
                self.config.dot_command, out.status
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::PermissionDenied => {
                Err(LineageError::ExternalToolUnavailable(format!("{}: {}", self.config.dot_command, e)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn render_image(&self, format: ImageFormat, source: &Path, target: &Path) -> LineageResult<()> {
        let out = Command::new(&self.config.dot_command)
            .arg(format!("-T{}", format.extension()))
            .arg(source)
            .arg("-o")
            .arg(target)
            .output()?;
        if !out.status.success() {
            return Err(LineageError::ExternalToolFailed {
                tool: self.config.dot_command.clone(),
                status: out.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn documents() -> LineageDocuments {
        LineageDocuments {
            full_dot: "digraph {\n}\n".into(),
            contracted_dot: "digraph {\n  node [shape=plaintext]\n}\n".into(),
            full_json: None,
            contracted_json: None,
        }
    }

    #[test]
    fn writes_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        let config = LineageConfig::new(dir.path().join("nested"));

        let written = OutputWriter::new(&config).write(&documents()).unwrap();
        assert_eq!(written.files.len(), 2);
        assert_eq!(fs::read_to_string(config.document_path(false, "dot")).unwrap(), "digraph {\n}\n");
        assert!(fs::read_to_string(config.document_path(true, "dot")).unwrap().contains("plaintext"));
        assert!(written.images.is_empty());
        assert!(!written.skipped_images);
    }

    #[test]
    fn existing_destination_fails_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let config = LineageConfig::new(dir.path());
        fs::write(config.document_path(true, "dot"), "old").unwrap();

        let err = OutputWriter::new(&config).write(&documents()).unwrap_err();
        assert!(matches!(err, LineageError::DestinationExists(ref p) if p == &config.document_path(true, "dot")));
        assert!(!config.document_path(false, "dot").exists());
        assert_eq!(fs::read_to_string(config.document_path(true, "dot")).unwrap(), "old");
    }

    #[test]
    fn overwrite_replaces_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = LineageConfig::new(dir.path()).with_overwrite(true);
        fs::write(config.document_path(false, "dot"), "old").unwrap();

        OutputWriter::new(&config).write(&documents()).unwrap();
        assert_eq!(fs::read_to_string(config.document_path(false, "dot")).unwrap(), "digraph {\n}\n");
    }

    #[test]
    fn missing_renderer_still_writes_documents() {
        let dir = tempfile::tempdir().unwrap();
        let config = LineageConfig::new(dir.path())
            .with_dot_command("definitely-not-a-graphviz-binary")
            .with_format("png")
            .unwrap();

        let written = OutputWriter::new(&config).write(&documents()).unwrap();
        assert!(written.skipped_images);
        assert!(written.images.is_empty());
        assert!(config.document_path(false, "dot").exists());
        assert!(!config.document_path(false, "png").exists());
    }

    #[test]
    fn existing_image_counts_as_destination() {
        let dir = tempfile::tempdir().unwrap();
        let config = LineageConfig::new(dir.path()).with_format("svg").unwrap();
        fs::write(config.document_path(false, "svg"), "<svg/>").unwrap();

        let err = OutputWriter::new(&config).write(&documents()).unwrap_err();
        assert!(matches!(err, LineageError::DestinationExists(_)));
        assert!(!config.document_path(false, "dot").exists());
    }

    #[test]
    fn json_documents_are_written_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let config = LineageConfig::new(dir.path()).with_prefix("flow");
        let mut docs = documents();
        docs.full_json = Some("{}\n".into());
        docs.contracted_json = Some("{}\n".into());

        let written = OutputWriter::new(&config).write(&docs).unwrap();
        assert_eq!(written.files.len(), 4);
        assert!(dir.path().join("flow_contracted.json").exists());
    }
}
