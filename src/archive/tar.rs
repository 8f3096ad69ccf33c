//! Streaming tar writer for a directory tree.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use tar::{Builder, Header, HeaderMode};

use crate::archive::walk::{walk_entries, EntryKind};

/// Write a tar archive of `root` into `out` in a single pass.
///
/// Regular files carry their content, symlinks are stored as links, other
/// node types are left out. Returns the number of entries written; write
/// errors end the walk.
pub fn write_tar<W: Write>(root: &Path, prefix: &str, out: W) -> io::Result<usize> {
    let mut builder = Builder::new(out);
    builder.follow_symlinks(false);
    let mut written = 0;

    for entry in walk_entries(root, prefix) {
        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(&entry.metadata, HeaderMode::Complete);

        match entry.kind {
            EntryKind::File => {
                let file = match File::open(&entry.path) {
                    Ok(f) => f,
                    Err(e) => {
                        tracing::warn!(path = %entry.path.display(), error = %e, "skipping unreadable file");
                        continue;
                    }
                };
                let size = entry.metadata.len();
                let mut body = Padded::new(file, size);
                builder.append_data(&mut header, &entry.name, &mut body)?;
                if body.padding > 0 {
                    tracing::warn!(
                        path = %entry.path.display(),
                        missing = body.padding,
                        "file shrank while archiving, entry zero-padded"
                    );
                }
            }
            EntryKind::Symlink => {
                let target = match fs::read_link(&entry.path) {
                    Ok(t) => t,
                    Err(e) => {
                        tracing::warn!(path = %entry.path.display(), error = %e, "skipping unreadable link");
                        continue;
                    }
                };
                header.set_size(0);
                builder.append_link(&mut header, &entry.name, &target)?;
            }
        }
        written += 1;
    }

    builder.finish()?;
    Ok(written)
}

/// Reads exactly `remaining` bytes: the file's content cut at the size the
/// header announced, zero-filled if the file ends early.
struct Padded<R> {
    inner: R,
    remaining: u64,
    padding: u64,
}

impl<R: Read> Padded<R> {
    fn new(inner: R, size: u64) -> Self {
        Self {
            inner,
            remaining: size,
            padding: 0,
        }
    }
}

impl<R: Read> Read for Padded<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let mut n = if self.padding == 0 {
            self.inner.read(&mut buf[..want])?
        } else {
            0
        };
        if n == 0 {
            buf[..want].fill(0);
            self.padding += want as u64;
            n = want;
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}
