//! Directory walking and archive entry naming.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::mapping::parser::{base_name, clean_path};

/// Kind of filesystem node that becomes an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Symlink,
}

/// One non-directory node found under the archive root.
#[derive(Debug)]
pub struct WalkEntry {
    pub path: PathBuf,
    /// Name inside the archive, forward slashes.
    pub name: String,
    pub metadata: Metadata,
    pub kind: EntryKind,
}

/// Archive name for `relative` under `root`: `prefix + base(root)` joined
/// with the relative path. A root of `.` contributes nothing.
pub fn entry_name(prefix: &str, root: &Path, relative: &Path) -> String {
    let base = base_name(&root.to_string_lossy());
    let base = match base.as_str() {
        "." | ".." | "/" => "",
        other => other,
    };
    let head = format!("{}{}", prefix, base);

    let rel: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let rel = rel.join("/");

    if head.is_empty() {
        clean_path(&rel)
    } else {
        clean_path(&format!("{}/{}", head, rel))
    }
}

/// Walk `root` in lexical order yielding regular files and symlinks.
///
/// Directories yield no entry; nodes that cannot be inspected are skipped
/// with a warning.
pub fn walk_entries<'a>(root: &'a Path, prefix: &'a str) -> impl Iterator<Item = WalkEntry> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "skipping unreadable archive entry");
                    return None;
                }
            };
            let kind = if entry.file_type().is_file() {
                EntryKind::File
            } else if entry.file_type().is_symlink() {
                EntryKind::Symlink
            } else {
                return None;
            };
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "skipping archive entry");
                    return None;
                }
            };
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let name = if relative.as_os_str().is_empty() {
                // root itself is a file
                base_name(&root.to_string_lossy())
            } else {
                entry_name(prefix, root, relative)
            };
            Some(WalkEntry {
                path: entry.path().to_path_buf(),
                name,
                metadata,
                kind,
            })
        })
}
