//! Streaming zip writer for a directory tree.

use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::Path;

use chrono::{DateTime, Datelike, Local, Timelike};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::walk::{walk_entries, EntryKind};

/// Write a zip archive of `root` into `out` without seeking.
///
/// Entries use data descriptors so `out` may be a socket-backed stream.
/// Symlinks are followed when they point at regular files. Unreadable
/// files are skipped; write errors end the walk.
pub fn write_zip<W: Write>(root: &Path, prefix: &str, store: bool, out: W) -> io::Result<usize> {
    let mut zip = ZipWriter::new_stream(out);
    let method = if store {
        CompressionMethod::Stored
    } else {
        CompressionMethod::Deflated
    };
    let mut written = 0;

    for entry in walk_entries(root, prefix) {
        let metadata = match entry.kind {
            EntryKind::File => entry.metadata,
            EntryKind::Symlink => match fs::metadata(&entry.path) {
                Ok(m) if m.is_file() => m,
                _ => continue,
            },
        };
        let file = match File::open(&entry.path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %entry.path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        zip.start_file(entry.name.as_str(), entry_options(&metadata, method))
            .map_err(io::Error::other)?;
        io::copy(&mut file.take(metadata.len()), &mut zip)?;
        written += 1;
    }

    zip.finish().map_err(io::Error::other)?;
    Ok(written)
}

fn entry_options(metadata: &Metadata, method: CompressionMethod) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default()
        .compression_method(method)
        .unix_permissions(permissions(metadata))
        .large_file(metadata.len() >= u32::MAX as u64);

    if let Some(modified) = metadata.modified().ok().and_then(dos_time) {
        options = options.last_modified_time(modified);
    }
    options
}

fn dos_time(modified: std::time::SystemTime) -> Option<zip::DateTime> {
    let local: DateTime<Local> = modified.into();
    zip::DateTime::from_date_and_time(
        u16::try_from(local.year()).ok()?,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}

#[cfg(unix)]
fn permissions(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permissions(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
