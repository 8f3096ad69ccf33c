//! Source classification.
//!
//! # Responsibilities
//! - Recognize endpoint sigils (`@` upload, `200` status, `30x` redirect)
//! - Recognize the literal-string source marker (`@text`)
//! - Hand URI sources to the scheme registry
//! - Fall back to a plain file or directory for everything else
//!
//! # Design Decisions
//! - First match wins, checks run in a fixed order
//! - Classification is pure apart from the upload directory stat; building
//!   adapters is a separate step

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::mapping::parser::Mapping;
use crate::mapping::registry::SchemeRegistry;
use crate::routing::normalize_endpoint;

/// Provider consulted for the autonomous system of a client address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsnLookup {
    Ripe,
}

/// A classified content source with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Multipart upload sink storing into `dir`.
    Upload { dir: PathBuf },
    /// Fixed empty `200 OK`.
    Status,
    /// Permanent redirect to a templated location.
    Redirect { location: String },
    /// Fixed text served as HTML.
    Literal { text: String },
    /// Single-upstream reverse proxy.
    Proxy { upstream: Url },
    /// Static file, or directory tree with listings.
    FileOrDir { path: PathBuf },
    /// Echo of the client address.
    MyIp { fuzzy: bool, lookup: Option<AsnLookup> },
    /// QR code image of fixed content.
    Qr { content: String },
    /// `git http-backend` over CGI.
    Git { root: PathBuf },
    /// `cgit` over CGI.
    Cgit { root: PathBuf },
    /// Tar stream of a directory, optionally gzip compressed.
    Tar {
        dir: PathBuf,
        prefix: String,
        gzip_level: Option<i32>,
    },
    /// Zip stream of a directory.
    Zip {
        dir: PathBuf,
        prefix: String,
        store: bool,
    },
    /// Read-only view into a zip archive.
    ZipFs {
        archive: PathBuf,
        prefix: String,
        index: Option<String>,
    },
}

impl Source {
    /// Verb used when reporting the binding.
    pub fn verb(&self) -> &'static str {
        match self {
            Source::Upload { .. } => "catches",
            Source::Redirect { .. } | Source::Status => "points at",
            _ => "throws",
        }
    }

    /// Content type applied when the adapter sets none itself.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Source::Tar { gzip_level: None, .. } => Some("application/x-tar"),
            Source::Tar { gzip_level: Some(_), .. } => Some("application/x-gtar"),
            Source::Zip { .. } => Some("application/zip"),
            Source::Qr { .. } => Some("image/png"),
            _ => None,
        }
    }
}

/// Errors produced while classifying a mapping.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("{kind} mapping needs a non-empty endpoint")]
    EmptyEndpoint { kind: &'static str },

    #[error("upload target {0:?} exists and is not a directory")]
    NotADirectory(PathBuf),

    #[error("qr mapping has no content")]
    EmptyQrContent,
}

/// A mapping with its endpoint sigils removed and its source classified.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub endpoint: String,
    pub source: Source,
}

/// Classify a parsed mapping.
///
/// The returned endpoint is normalized to start with `/`, the form both the
/// dispatch table and the adapters see.
pub fn classify(mapping: &Mapping, registry: &SchemeRegistry) -> Result<Classified, ClassifyError> {
    let mut classified = classify_source(mapping, registry)?;
    classified.endpoint = normalize_endpoint(&classified.endpoint);
    Ok(classified)
}

fn classify_source(mapping: &Mapping, registry: &SchemeRegistry) -> Result<Classified, ClassifyError> {
    let Mapping { endpoint, source } = mapping;

    if let Some(rest) = endpoint.strip_prefix('@') {
        if rest.is_empty() {
            return Err(ClassifyError::EmptyEndpoint { kind: "upload" });
        }
        let dir = PathBuf::from(source);
        if let Ok(meta) = std::fs::metadata(&dir) {
            if !meta.is_dir() {
                return Err(ClassifyError::NotADirectory(dir));
            }
        }
        return Ok(Classified {
            endpoint: rest.to_string(),
            source: Source::Upload { dir },
        });
    }

    if let Some(rest) = endpoint.strip_prefix("200") {
        if rest.is_empty() {
            return Err(ClassifyError::EmptyEndpoint { kind: "status" });
        }
        return Ok(Classified {
            endpoint: rest.to_string(),
            source: Source::Status,
        });
    }

    if let Some(rest) = endpoint.strip_prefix("30x") {
        if rest.is_empty() {
            return Err(ClassifyError::EmptyEndpoint { kind: "redirect" });
        }
        return Ok(Classified {
            endpoint: rest.to_string(),
            source: Source::Redirect {
                location: source.clone(),
            },
        });
    }

    if let Some(text) = source.strip_prefix('@') {
        return Ok(Classified {
            endpoint: endpoint.clone(),
            source: Source::Literal {
                text: text.to_string(),
            },
        });
    }

    let classified = match Url::parse(source) {
        Ok(url) => match registry.get(url.scheme()) {
            Some(classifier) => classifier(&url)?,
            None => Source::FileOrDir {
                path: PathBuf::from(source),
            },
        },
        Err(_) => Source::FileOrDir {
            path: PathBuf::from(source),
        },
    };

    Ok(Classified {
        endpoint: endpoint.clone(),
        source: classified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(endpoint: &str, source: &str) -> Result<Classified, ClassifyError> {
        let mapping = Mapping {
            endpoint: endpoint.to_string(),
            source: source.to_string(),
        };
        classify(&mapping, &SchemeRegistry::default())
    }

    #[test]
    fn test_upload_sigil() {
        let dir = tempfile::tempdir().unwrap();
        let c = run("@/up", dir.path().to_str().unwrap()).unwrap();
        assert_eq!(c.endpoint, "/up");
        assert_eq!(c.source.verb(), "catches");

        assert_eq!(
            run("@", "/tmp").unwrap_err(),
            ClassifyError::EmptyEndpoint { kind: "upload" }
        );

        let file = dir.path().join("f");
        std::fs::write(&file, "x").unwrap();
        assert_eq!(
            run("@/up", file.to_str().unwrap()).unwrap_err(),
            ClassifyError::NotADirectory(file)
        );
    }

    #[test]
    fn test_redirect_and_status_sigils() {
        let c = run("30x/old", "https://example.com/new").unwrap();
        assert_eq!(c.endpoint, "/old");
        assert!(matches!(c.source, Source::Redirect { .. }));
        assert_eq!(c.source.verb(), "points at");

        let c = run("200/health", "ok").unwrap();
        assert_eq!(c.endpoint, "/health");
        assert_eq!(c.source, Source::Status);

        assert!(run("30x", "x").is_err());
    }

    #[test]
    fn test_literal_source() {
        let c = run("/hello", "@Hello: World").unwrap();
        assert_eq!(
            c.source,
            Source::Literal {
                text: "Hello: World".to_string()
            }
        );
    }

    #[test]
    fn test_scheme_dispatch() {
        let c = run("/p/", "http://127.0.0.1:9000/api").unwrap();
        assert!(matches!(c.source, Source::Proxy { .. }));

        let c = run("/a.tgz", "tgz://./docs?prefix=x/&level=9").unwrap();
        assert_eq!(
            c.source,
            Source::Tar {
                dir: PathBuf::from("docs"),
                prefix: "x/".to_string(),
                gzip_level: Some(9),
            }
        );
        assert_eq!(c.source.content_type(), Some("application/x-gtar"));

        let c = run("/a.zip", "zip://.?store").unwrap();
        assert_eq!(
            c.source,
            Source::Zip {
                dir: PathBuf::from("."),
                prefix: String::new(),
                store: true,
            }
        );

        let c = run("/me", "myip://?fuzzy&info=ripe").unwrap();
        assert_eq!(
            c.source,
            Source::MyIp {
                fuzzy: true,
                lookup: Some(AsnLookup::Ripe)
            }
        );
    }

    #[test]
    fn test_fallback_to_file() {
        let c = run("/f", "some/relative/path").unwrap();
        assert_eq!(
            c.source,
            Source::FileOrDir {
                path: PathBuf::from("some/relative/path")
            }
        );

        let c = run("/f", "unknown://thing").unwrap();
        assert_eq!(
            c.source,
            Source::FileOrDir {
                path: PathBuf::from("unknown://thing")
            }
        );
    }

    #[test]
    fn test_endpoint_gains_leading_slash() {
        assert_eq!(run("docs/", "some/dir").unwrap().endpoint, "/docs/");
        assert_eq!(run("hello", "@hi").unwrap().endpoint, "/hello");
        assert_eq!(run("30xold", "/new").unwrap().endpoint, "/old");

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run("@up", dir.path().to_str().unwrap()).unwrap().endpoint, "/up");
    }

    #[test]
    fn test_empty_qr() {
        assert_eq!(run("/qr", "qr://").unwrap_err(), ClassifyError::EmptyQrContent);
    }
}
