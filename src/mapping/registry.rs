//! Scheme registry for URI sources.
//!
//! Maps a URI scheme to the function that turns the parsed URI into a
//! [`Source`]. The default registry carries every built-in scheme; callers
//! may register more before resolving mappings.

use std::collections::HashMap;
use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::mapping::parser::{has_query_param, level_in_range, local_filename, query_param};
use crate::mapping::source::{AsnLookup, ClassifyError, Source};

/// Turns a parsed source URI into a classified source.
pub type SchemeClassifier = fn(&Url) -> Result<Source, ClassifyError>;

const DEFAULT_GZIP_LEVEL: i32 = 6;

/// Scheme string → classifier lookup.
#[derive(Clone)]
pub struct SchemeRegistry {
    classifiers: HashMap<String, SchemeClassifier>,
}

impl SchemeRegistry {
    /// An empty registry; every URI falls back to a plain path.
    pub fn empty() -> Self {
        Self {
            classifiers: HashMap::new(),
        }
    }

    /// Register (or replace) the classifier for `scheme`.
    pub fn register(&mut self, scheme: &str, classifier: SchemeClassifier) -> &mut Self {
        self.classifiers.insert(scheme.to_ascii_lowercase(), classifier);
        self
    }

    pub fn get(&self, scheme: &str) -> Option<SchemeClassifier> {
        self.classifiers.get(&scheme.to_ascii_lowercase()).copied()
    }

    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.classifiers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("http", proxy)
            .register("https", proxy)
            .register("file", file)
            .register("myip", myip)
            .register("qr", qr)
            .register("git", git)
            .register("cgit", cgit)
            .register("tar", tar)
            .register("tar+gz", tar_gz)
            .register("tar.gz", tar_gz)
            .register("tgz", tar_gz)
            .register("zip", zip)
            .register("zipfs", zipfs);
        registry
    }
}

impl std::fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemeRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

fn prefix(url: &Url) -> String {
    query_param(url, "prefix").unwrap_or_default()
}

fn proxy(url: &Url) -> Result<Source, ClassifyError> {
    Ok(Source::Proxy {
        upstream: url.clone(),
    })
}

fn file(url: &Url) -> Result<Source, ClassifyError> {
    Ok(Source::FileOrDir {
        path: PathBuf::from(local_filename(url)),
    })
}

fn myip(url: &Url) -> Result<Source, ClassifyError> {
    let lookup = match query_param(url, "info").as_deref() {
        Some("ripe") => Some(AsnLookup::Ripe),
        Some(other) => {
            tracing::warn!(info = %other, "unknown address info provider, ignoring");
            None
        }
        None => None,
    };
    Ok(Source::MyIp {
        fuzzy: has_query_param(url, "fuzzy"),
        lookup,
    })
}

fn qr(url: &Url) -> Result<Source, ClassifyError> {
    let path = percent_decode_str(url.path()).decode_utf8_lossy();
    let content = path.strip_prefix('/').unwrap_or(&path);
    if content.is_empty() {
        return Err(ClassifyError::EmptyQrContent);
    }
    Ok(Source::Qr {
        content: content.to_string(),
    })
}

fn git(url: &Url) -> Result<Source, ClassifyError> {
    Ok(Source::Git {
        root: PathBuf::from(local_filename(url)),
    })
}

fn cgit(url: &Url) -> Result<Source, ClassifyError> {
    Ok(Source::Cgit {
        root: PathBuf::from(local_filename(url)),
    })
}

fn tar(url: &Url) -> Result<Source, ClassifyError> {
    Ok(Source::Tar {
        dir: PathBuf::from(local_filename(url)),
        prefix: prefix(url),
        gzip_level: None,
    })
}

fn tar_gz(url: &Url) -> Result<Source, ClassifyError> {
    let raw = query_param(url, "level").unwrap_or_default();
    let (level, err) = level_in_range(&raw, -1, 9, DEFAULT_GZIP_LEVEL);
    if let Some(err) = err {
        tracing::warn!(error = %err, fallback = level, "invalid compression level");
    }
    Ok(Source::Tar {
        dir: PathBuf::from(local_filename(url)),
        prefix: prefix(url),
        gzip_level: Some(level),
    })
}

fn zip(url: &Url) -> Result<Source, ClassifyError> {
    Ok(Source::Zip {
        dir: PathBuf::from(local_filename(url)),
        prefix: prefix(url),
        store: has_query_param(url, "store"),
    })
}

fn zipfs(url: &Url) -> Result<Source, ClassifyError> {
    Ok(Source::ZipFs {
        archive: PathBuf::from(local_filename(url)),
        prefix: prefix(url),
        index: query_param(url, "index").filter(|i| !i.is_empty()),
    })
}
