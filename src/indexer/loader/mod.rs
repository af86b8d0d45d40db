
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::Result;

/// File extensions treated as indexable text, lowercase and without the dot
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "js", "py", "java", "c", "cpp", "h", "cs", "html", "css", "xml", "json", "yaml",
    "yml", "ini", "cfg", "conf", "rs", "toml", "ts", "tsx", "jsx", "go", "hpp", "sh",
];

/// One loaded source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub path: PathBuf,
    /// Path relative to the repository root, used as the chunk source
    pub relative_path: String,
}

/// Whether `path` has an allow-listed extension. Compares case-insensitively and
/// never touches the filesystem.
#[inline]
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            TEXT_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Read `path` as strict UTF-8
#[inline]
pub fn load_document(root: &Path, path: &Path) -> Result<Document> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content = String::from_utf8(bytes)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;

    let relative_path = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    debug!("Loaded {} ({} bytes)", relative_path, content.len());

    Ok(Document {
        content,
        path: path.to_path_buf(),
        relative_path,
    })
}
