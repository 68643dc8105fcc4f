//! FileProcessor - persists incoming files under a base directory

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};

use contracts::{ContractError, ProcessingResult, Processor, RequestContext};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, error, instrument, warn};

/// Configuration for FileProcessor
#[derive(Debug, Clone)]
pub struct FileProcessorConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileProcessorConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./processed"));

        Self { base_path }
    }
}

/// Sidecar written next to every stored file
#[derive(Debug, Serialize)]
struct FileManifest<'a> {
    file: &'a str,
    bytes: u64,
    processed_at: String,
    context: BTreeMap<String, String>,
}

/// Processor that copies each file to disk with a `.meta.json` sidecar
pub struct FileProcessor {
    name: String,
    config: FileProcessorConfig,
}

impl FileProcessor {
    /// Create a new FileProcessor
    pub fn new(name: impl Into<String>, config: FileProcessorConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        std::fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileProcessorConfig::from_params(params);
        Self::new(name, config)
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// Map a blob name onto a path below `base_path`
    ///
    /// Blob names may contain `/`; absolute paths and `..` are rejected.
    fn resolve_target(&self, file: &str) -> Result<PathBuf, ContractError> {
        let relative = Path::new(file);
        let mut target = self.config.base_path.clone();
        let mut depth = 0;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    target.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                _ => {
                    return Err(ContractError::invalid_input(
                        "file.name",
                        format!("'{file}' escapes the output directory"),
                    ))
                }
            }
        }
        if depth == 0 {
            return Err(ContractError::invalid_input(
                "file.name",
                format!("'{file}' does not name a file"),
            ));
        }
        Ok(target)
    }

    fn sibling(target: &Path, suffix: &str) -> PathBuf {
        let mut path = target.as_os_str().to_owned();
        path.push(suffix);
        PathBuf::from(path)
    }

    fn manifest_path(target: &Path) -> PathBuf {
        Self::sibling(target, ".meta.json")
    }

    /// Stream into `<name>.part` files, then move data and manifest into place
    async fn persist<R>(
        &self,
        target: &Path,
        context: &RequestContext,
        file: &str,
        content: &mut R,
    ) -> std::io::Result<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let manifest_target = Self::manifest_path(target);
        let staged = StagedFiles::new(vec![
            Self::sibling(target, ".part"),
            Self::sibling(&manifest_target, ".part"),
        ]);

        let mut out = tokio::fs::File::create(&staged.paths[0]).await?;
        let bytes = tokio::io::copy(content, &mut out).await?;
        out.flush().await?;
        drop(out);

        let manifest = FileManifest {
            file,
            bytes,
            processed_at: chrono::Utc::now().to_rfc3339(),
            context: context.without_secret(),
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(&staged.paths[1], json).await?;

        // Both renames happen without an await in between
        std::fs::rename(&staged.paths[0], target)?;
        std::fs::rename(&staged.paths[1], &manifest_target)?;
        staged.commit();

        Ok(bytes)
    }
}

/// Temporary files removed on drop unless committed
struct StagedFiles {
    paths: Vec<PathBuf>,
    committed: bool,
}

impl StagedFiles {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove staged file");
                }
            }
        }
    }
}

impl Processor for FileProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_processor_run",
        skip(self, context, content),
        fields(processor = %self.name)
    )]
    async fn run<R>(
        &self,
        context: RequestContext,
        content: &mut R,
    ) -> Result<ProcessingResult, ContractError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let file = context
            .container_name()
            .ok_or_else(|| ContractError::invalid_input("context.ContainerName", "missing"))?;
        let target = self.resolve_target(file)?;

        let bytes = self
            .persist(&target, &context, file, content)
            .await
            .map_err(|e| {
                error!(processor = %self.name, file = %file, error = %e, "Write failed");
                ContractError::processor_failure_with(&self.name, e)
            })?;

        debug!(processor = %self.name, path = %target.display(), bytes, "File stored");
        Ok(format!("stored {file} ({bytes} bytes)"))
    }
}
