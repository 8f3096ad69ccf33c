//! Mapping string parsing.
//!
//! # Responsibilities
//! - Split `endpoint:source` at the first separator
//! - Expand bare filenames into `/<basename>` endpoints
//! - Lexical path helpers shared by classifier and archive code
//!
//! # Design Decisions
//! - A stat that succeeds wins over splitting, so `ls | xargs mapserve` works
//! - Only the first `:` separates; sources keep their own colons (URIs)

use std::fmt;

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

/// Errors produced while splitting a raw mapping.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("doesn't contain the endpoint-source separator ':'")]
    MissingSeparator,

    #[error("empty endpoint or source")]
    EmptyPart,
}

/// A parsed mapping: URL endpoint plus the content source it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub endpoint: String,
    pub source: String,
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.endpoint, self.source)
    }
}

/// Parse a raw mapping argument.
pub fn parse_mapping(raw: &str) -> Result<Mapping, MappingError> {
    if !raw.is_empty() {
        if let Ok(meta) = std::fs::metadata(raw) {
            let name = base_name(raw);
            let endpoint = if meta.is_dir() {
                format!("/{}/", name)
            } else {
                format!("/{}", name)
            };
            return Ok(Mapping {
                endpoint,
                source: raw.to_string(),
            });
        }
    }

    let (endpoint, source) = raw.split_once(':').ok_or(MappingError::MissingSeparator)?;
    if endpoint.is_empty() || source.is_empty() {
        return Err(MappingError::EmptyPart);
    }

    Ok(Mapping {
        endpoint: endpoint.to_string(),
        source: source.to_string(),
    })
}

/// Local filesystem path named by a URL: host joined with the decoded path.
///
/// `s://./cwd.txt` → `cwd.txt`, `s:///absolute.txt` → `/absolute.txt`.
pub fn local_filename(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    let path = percent_decode_str(url.path()).decode_utf8_lossy();

    let joined = match (host.is_empty(), path.is_empty()) {
        (true, true) => return ".".to_string(),
        (false, true) => host.to_string(),
        (true, false) => path.into_owned(),
        (false, false) => format!("{}/{}", host, path),
    };
    clean_path(&joined)
}

/// Whether `key` appears in the URL query, with or without a value.
pub fn has_query_param(url: &Url, key: &str) -> bool {
    url.query_pairs().any(|(k, _)| k == key)
}

/// Value of the first `key` in the URL query.
pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Error returned by [`level_in_range`] when the fallback had to be used.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{value:?} is not a number in [{min}, {max}]")]
pub struct LevelError {
    pub value: String,
    pub min: i32,
    pub max: i32,
}

/// Parse an integer setting constrained to `min..=max`.
///
/// Empty input silently yields `fallback`. Invalid or out of range input
/// yields `fallback` together with the error for the caller to report.
pub fn level_in_range(text: &str, min: i32, max: i32, fallback: i32) -> (i32, Option<LevelError>) {
    if text.is_empty() {
        return (fallback, None);
    }
    match text.parse::<i32>() {
        Ok(n) if (min..=max).contains(&n) => (n, None),
        _ => (
            fallback,
            Some(LevelError {
                value: text.to_string(),
                min,
                max,
            }),
        ),
    }
}

/// Last element of a slash separated path, ignoring trailing slashes.
///
/// Empty input yields `.`, all-slash input yields `/`.
pub fn base_name(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rsplit_once('/') {
        Some((_, last)) => last.to_string(),
        None => trimmed.to_string(),
    }
}

/// Lexically clean a slash separated path.
///
/// Collapses repeated separators, drops `.` elements and resolves `..`
/// against preceding elements where possible.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let body = parts.join("/");
    match (rooted, body.is_empty()) {
        (true, _) => format!("/{}", body),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping_split() {
        assert_eq!(parse_mapping(""), Err(MappingError::MissingSeparator));
        assert_eq!(parse_mapping("w"), Err(MappingError::MissingSeparator));
        assert_eq!(parse_mapping(":rest"), Err(MappingError::EmptyPart));
        assert_eq!(parse_mapping("w:"), Err(MappingError::EmptyPart));

        let m = parse_mapping("w:t").unwrap();
        assert_eq!((m.endpoint.as_str(), m.source.as_str()), ("w", "t"));

        let m = parse_mapping("w:t:rest").unwrap();
        assert_eq!((m.endpoint.as_str(), m.source.as_str()), ("w", "t:rest"));
    }

    #[test]
    fn test_parse_mapping_round_trip() {
        for raw in ["/a:b", "/x/:http://example.com:8080/y", "@/up:/tmp/u", "/q:@a:b:c"] {
            let m = parse_mapping(raw).unwrap();
            assert!(!m.endpoint.contains(':'));
            assert_eq!(m.to_string(), raw);
        }
    }

    #[test]
    fn test_parse_mapping_bare_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hello").unwrap();

        let m = parse_mapping(file.to_str().unwrap()).unwrap();
        assert_eq!(m.endpoint, "/notes.txt");
        assert_eq!(m.source, file.to_str().unwrap());

        let sub = dir.path().join("docs");
        std::fs::create_dir(&sub).unwrap();
        let m = parse_mapping(sub.to_str().unwrap()).unwrap();
        assert_eq!(m.endpoint, "/docs/");
    }

    #[test]
    fn test_local_filename() {
        let cases = [
            ("s://./cwd.txt", "cwd.txt"),
            ("s:///absolute.txt", "/absolute.txt"),
            ("s://../relative.txt", "../relative.txt"),
            ("tar://.", "."),
            ("zip://./", "."),
            ("git://repos/", "repos"),
        ];
        for (input, expected) in cases {
            let url = Url::parse(input).unwrap();
            assert_eq!(local_filename(&url), expected, "input {}", input);
        }
    }

    #[test]
    fn test_query_params() {
        let url = Url::parse("zip://./?store&prefix=x/").unwrap();
        assert!(has_query_param(&url, "store"));
        assert!(has_query_param(&url, "prefix"));
        assert!(!has_query_param(&url, "index"));
        assert_eq!(query_param(&url, "prefix").as_deref(), Some("x/"));
        assert_eq!(query_param(&url, "store").as_deref(), Some(""));
    }

    #[test]
    fn test_level_in_range() {
        let cases = [
            ("", 10, false),
            ("0", 0, false),
            ("5", 5, false),
            ("9", 10, true),
            ("-1", 10, true),
            ("a", 10, true),
        ];
        for (input, expected, failed) in cases {
            let (n, err) = level_in_range(input, 0, 5, 10);
            assert_eq!(n, expected, "input {:?}", input);
            assert_eq!(err.is_some(), failed, "input {:?}", input);
        }
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("./a//b/"), "a/b");
        assert_eq!(clean_path("/a/../../b"), "/b");
        assert_eq!(clean_path("../a/./b/.."), "../a");
        assert_eq!(clean_path("a/.."), ".");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/tmp/docs/"), "docs");
        assert_eq!(base_name("file.txt"), "file.txt");
        assert_eq!(base_name("."), ".");
        assert_eq!(base_name(""), ".");
        assert_eq!(base_name("///"), "/");
    }
}
