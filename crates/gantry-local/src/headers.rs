//! License header check
//!
//! Scans `<capability>.source_dir` under the module for files with one of
//! `<capability>.extensions` and requires `<capability>.header` within the
//! first lines of each.

use std::path::{Path, PathBuf};

use gantry_core::ModuleContext;

use crate::error::{Error, Result};

/// Lines searched for the header, enough for a leading block comment
const HEADER_WINDOW: usize = 20;

/// Check every matching source file of the module for `prefix`'s header options
pub async fn check_headers(ctx: &ModuleContext, prefix: &str) -> Result<()> {
    let key = |option: &str| format!("{prefix}.{option}");
    let Some(header) = ctx.config.get_str(&key("header")) else {
        return Err(Error::MissingOption { key: key("header") });
    };
    let extensions = ctx.config.get_string_list(&key("extensions"));
    let source_dir = ctx
        .module_dir
        .join(ctx.config.get_str(&key("source_dir")).unwrap_or("src"));

    let files = source_files(&source_dir, &extensions).await?;
    let mut missing = Vec::new();
    for file in &files {
        let content = tokio::fs::read_to_string(file).await?;
        if !content.lines().take(HEADER_WINDOW).any(|line| line.contains(header)) {
            missing.push(file.strip_prefix(&ctx.module_dir).unwrap_or(file.as_path()).to_path_buf());
        }
    }

    tracing::debug!(
        module = %ctx.module,
        checked = files.len(),
        missing = missing.len(),
        "Checked license headers"
    );
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::HeaderMissing { files: missing })
    }
}

/// Files under `dir` with a matching extension, sorted. A missing `dir` has none.
async fn source_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
            {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
