//! Mapping resolution: parse → classify → build → bind.
//!
//! # Responsibilities
//! - Run every raw mapping through the pipeline in argument order
//! - Report each successful binding with its verb
//! - Skip (and warn about) mappings that fail at any step
//!
//! # Design Decisions
//! - Failures are per mapping; the caller decides what zero bindings means
//! - Later bindings to an identical endpoint replace earlier ones

use crate::adapters::{self, BuildContext};
use crate::mapping::parser::parse_mapping;
use crate::mapping::registry::SchemeRegistry;
use crate::mapping::source::classify;
use crate::routing::Dispatch;

/// Outcome of resolving all mappings.
#[derive(Debug)]
pub struct Resolved {
    pub dispatch: Dispatch,
    /// Endpoints in the order they were bound.
    pub endpoints: Vec<String>,
    /// Number of mappings that were skipped.
    pub skipped: usize,
}

/// Resolve `raw` mappings into a dispatch table.
pub fn resolve_mappings(raw: &[String], registry: &SchemeRegistry, ctx: &BuildContext) -> Resolved {
    let mut dispatch = Dispatch::new();
    let mut endpoints = Vec::new();
    let mut skipped = 0;

    for (position, arg) in raw.iter().enumerate() {
        let mapping = match parse_mapping(arg) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(position, mapping = %arg, error = %e, "skipping mapping");
                skipped += 1;
                continue;
            }
        };

        let classified = match classify(&mapping, registry) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(position, mapping = %arg, error = %e, "skipping mapping");
                skipped += 1;
                continue;
            }
        };

        let adapter = match adapters::build(&classified.source, &classified.endpoint, ctx) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(position, mapping = %arg, error = %e, "skipping mapping");
                skipped += 1;
                continue;
            }
        };

        tracing::info!(
            "mapserve {} {:?} through {:?}",
            classified.source.verb(),
            mapping.source,
            classified.endpoint
        );

        if dispatch.bind(&classified.endpoint, adapter) {
            tracing::warn!(endpoint = %classified.endpoint, "endpoint rebound, earlier mapping replaced");
        }
        endpoints.push(classified.endpoint);
    }

    Resolved {
        dispatch,
        endpoints,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::CompressionPools;
    use std::sync::Arc;

    fn ctx() -> BuildContext {
        BuildContext::new(1024, Arc::new(CompressionPools::default()))
    }

    #[test]
    fn test_resolve_skips_failures() {
        let raw = vec![
            "no-separator-and-missing".to_string(),
            "/hello:@hi".to_string(),
            ":empty".to_string(),
            "30x/old:/new".to_string(),
        ];
        let resolved = resolve_mappings(&raw, &SchemeRegistry::default(), &ctx());
        assert_eq!(resolved.endpoints, vec!["/hello", "/old"]);
        assert_eq!(resolved.skipped, 2);
        assert_eq!(resolved.dispatch.len(), 2);
    }

    #[test]
    fn test_resolve_normalizes_endpoints() {
        let raw = vec!["docs/:@first".to_string(), "/docs/:@second".to_string()];
        let resolved = resolve_mappings(&raw, &SchemeRegistry::default(), &ctx());
        assert_eq!(resolved.endpoints, vec!["/docs/", "/docs/"]);
        assert_eq!(resolved.dispatch.len(), 1);
        assert_eq!(resolved.dispatch.endpoints(), vec!["/docs/"]);
    }

    #[test]
    fn test_resolve_nothing() {
        let resolved = resolve_mappings(&[], &SchemeRegistry::default(), &ctx());
        assert!(resolved.dispatch.is_empty());
    }
}
