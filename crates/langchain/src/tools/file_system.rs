use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};

use super::error::{ToolError, ToolResult};
use super::{string_argument, Tool};
use crate::models::tool::{ParameterType, ToolFunction, ToolParameter};

/// Reads and writes files below a root directory
///
/// Relative paths are resolved against the root; any path that would leave it is rejected.
pub struct FileSystem {
    root: PathBuf,
    functions: Vec<ToolFunction>,
}

impl FileSystem {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let path = || {
            ToolParameter::new(
                "path",
                ParameterType::String,
                "Path relative to the root directory",
            )
            .required()
        };
        Self {
            root: root.as_ref().to_path_buf(),
            functions: vec![
                ToolFunction::new("list_directory", "List contents of directory", vec![path()]),
                ToolFunction::new("read_file", "Read the contents of a file", vec![path()]),
                ToolFunction::new(
                    "write_to_file",
                    "Write content to a file",
                    vec![
                        path(),
                        ToolParameter::new("content", ParameterType::String, "Content to write")
                            .required(),
                    ],
                ),
            ],
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Helper method to resolve a path below the root, without touching the disk
    fn lexical_path(&self, path_str: &str) -> ToolResult<PathBuf> {
        let path = Path::new(path_str);
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).map_err(|_| outside_root(path_str))?
        } else {
            path
        };

        let mut resolved = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(outside_root(path_str));
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(outside_root(path_str)),
            }
        }
        Ok(self.root.join(resolved))
    }

    /// Resolve a path below the root, following symlinks in the part that exists
    ///
    /// Write targets may not exist yet, so the deepest existing ancestor is the one checked.
    async fn resolve_path(&self, path_str: &str) -> ToolResult<PathBuf> {
        let resolved = self.lexical_path(path_str)?;
        let root = tokio::fs::canonicalize(&self.root).await.map_err(|e| {
            ToolError::ExecutionError(format!("Failed to resolve root directory: {}", e))
        })?;

        let mut existing = resolved.as_path();
        while tokio::fs::symlink_metadata(existing).await.is_err() {
            existing = existing.parent().ok_or_else(|| outside_root(path_str))?;
        }
        // a dangling symlink cannot be canonicalized and is rejected with the rest
        match tokio::fs::canonicalize(existing).await {
            Ok(real) if real.starts_with(&root) => Ok(resolved),
            _ => Err(outside_root(path_str)),
        }
    }

    async fn list_directory(&self, path: &Path) -> ToolResult<String> {
        let mut entries = tokio::fs::read_dir(path).await.map_err(|e| {
            ToolError::ExecutionError(format!("Failed to read directory: {}", e))
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();
        Ok(names.join("\n"))
    }

    async fn read_file(&self, path: &Path) -> ToolResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Failed to read file: {}", e)))
    }

    async fn write_to_file(&self, path: &Path, content: &str) -> ToolResult<String> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Failed to write file: {}", e)))?;
        Ok(format!("Successfully wrote to {}", path.display()))
    }
}

fn outside_root(path: &str) -> ToolError {
    ToolError::InvalidParameters(format!(
        "The path '{}' is outside of the allowed directory",
        path
    ))
}

#[async_trait]
impl Tool for FileSystem {
    fn name(&self) -> &str {
        "file_system"
    }

    fn description(&self) -> &str {
        "Useful for listing directories, reading files and writing files within a working \
         directory."
    }

    fn functions(&self) -> &[ToolFunction] {
        &self.functions
    }

    async fn execute(&self, function: &str, arguments: &Map<String, Value>) -> ToolResult<String> {
        let path = self.resolve_path(string_argument(arguments, "path")?).await?;
        tracing::debug!(function, path = %path.display(), "file system call");

        match function {
            "list_directory" => self.list_directory(&path).await,
            "read_file" => self.read_file(&path).await,
            "write_to_file" => {
                let content = string_argument(arguments, "content")?;
                self.write_to_file(&path, content).await
            }
            _ => Err(ToolError::FunctionNotFound(function.to_string())),
        }
    }
}
