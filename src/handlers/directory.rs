//! Filesystem-backed handler.
//!
//! # Responsibilities
//! - Resolve selectors to files under a fixed root
//! - Refuse anything that resolves outside the root
//! - Serve `index` files or generated listings for directories
//! - Return UTF-8 files as text and everything else as binary
//!
//! # Design Decisions
//! - Paths are canonicalized, so `..` and symlinks are resolved before the
//!   confinement check
//! - Confinement compares path components, never string prefixes
//! - Missing paths and confinement violations are both NotFound

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use crate::gopher::{ItemType, Menu, MenuItem, Request, Response};
use crate::handlers::classify::{ContentClassifier, PlainTextClassifier, SAMPLE_LEN};
use crate::handlers::{Handler, HandlerError};

/// File served for a directory when menus are not generated.
pub const INDEX_FILE: &str = "index";

/// Serves files from a directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryHandler {
    base_path: PathBuf,
    generate_menus: bool,
    classifier: Arc<dyn ContentClassifier>,
}

impl DirectoryHandler {
    /// Create a handler rooted at `base_path`.
    ///
    /// The root is canonicalized here; it must exist and be a directory.
    pub fn new(base_path: impl AsRef<Path>) -> io::Result<Self> {
        let base_path = std::fs::canonicalize(base_path.as_ref())?;
        if !base_path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", base_path.display()),
            ));
        }

        Ok(Self {
            base_path,
            generate_menus: false,
            classifier: Arc::new(PlainTextClassifier),
        })
    }

    /// Generate listings for directories instead of serving `index` files.
    pub fn with_generate_menus(mut self, generate_menus: bool) -> Self {
        self.generate_menus = generate_menus;
        self
    }

    /// Replace the classifier used for generated listings.
    pub fn with_classifier(mut self, classifier: impl ContentClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn generate_menus(&self) -> bool {
        self.generate_menus
    }

    /// Canonicalize `path` and check it stays under the root.
    async fn resolve(&self, path: &Path) -> Result<PathBuf, HandlerError> {
        let resolved = match tokio::fs::canonicalize(path).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::trace!(path = %path.display(), error = %e, "Path does not resolve");
                return Err(HandlerError::NotFound);
            }
        };
        if !is_within(&self.base_path, &resolved) {
            tracing::debug!(
                root = %self.base_path.display(),
                path = %resolved.display(),
                "Path escapes the served root"
            );
            return Err(HandlerError::NotFound);
        }
        Ok(resolved)
    }

    async fn listing(&self, dir: &Path, request: &Request) -> Result<Menu, HandlerError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => tracing::debug!(name = ?name, "Skipping non UTF-8 file name"),
            }
        }
        names.sort();

        let mut menu = Menu::new();
        for name in names {
            let path = dir.join(&name);
            if self.resolve(&path).await.is_err() {
                continue;
            }
            let item_type = match self.entry_type(&path).await {
                Ok(item_type) => item_type,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let selector = child_selector(request.selector(), &name);
            match MenuItem::new(item_type, name.as_str(), selector, request.hostname(), request.port()) {
                Ok(item) => menu.push(item),
                Err(e) => tracing::debug!(name = %name, error = %e, "Skipping unrepresentable entry"),
            }
        }
        Ok(menu)
    }

    async fn entry_type(&self, path: &Path) -> io::Result<ItemType> {
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.is_dir() {
            return Ok(ItemType::Directory);
        }

        let mut head = Vec::with_capacity(SAMPLE_LEN);
        let file = tokio::fs::File::open(path).await?;
        file.take(SAMPLE_LEN as u64).read_to_end(&mut head).await?;

        Ok(self.classifier.classify(path, &head).unwrap_or(ItemType::Text))
    }
}

#[async_trait]
impl Handler for DirectoryHandler {
    async fn handle(&self, request: &Request) -> Result<Response, HandlerError> {
        let relative = request.selector().strip_prefix('/').unwrap_or(request.selector());
        let mut path = self.resolve(&self.base_path.join(relative)).await?;

        let metadata = tokio::fs::metadata(&path).await.map_err(not_found_or_io)?;
        if metadata.is_dir() {
            if self.generate_menus {
                return Ok(Response::Menu(self.listing(&path, request).await?));
            }
            path = self.resolve(&path.join(INDEX_FILE)).await?;
        }

        let metadata = tokio::fs::metadata(&path).await.map_err(not_found_or_io)?;
        if !metadata.is_file() {
            return Err(HandlerError::NotFound);
        }

        let contents = tokio::fs::read(&path).await.map_err(not_found_or_io)?;
        Ok(match String::from_utf8(contents) {
            Ok(text) => Response::Text(text),
            Err(e) => Response::Binary(e.into_bytes()),
        })
    }
}

/// True when `path` is `root` itself or lies beneath it.
///
/// `Path::starts_with` compares whole components, so `/srv-public` is not
/// within `/srv`.
pub fn is_within(root: &Path, path: &Path) -> bool {
    path.starts_with(root)
}

fn child_selector(parent: &str, name: &str) -> String {
    if parent.is_empty() || parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

fn not_found_or_io(e: io::Error) -> HandlerError {
    match e.kind() {
        io::ErrorKind::NotFound => HandlerError::NotFound,
        _ => HandlerError::Io(e),
    }
}
