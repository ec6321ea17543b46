//! Cached stream resolver implementation
//!
//! Stream URLs carry expiring tokens, so resolved programs are only kept in
//! memory and only for a short time.

use super::{ResolveError, ResolvedVideo, StreamResolver};
use crate::cache::SessionCache;
use crate::catalog::Language;
use chrono::Utc;
use std::time::Duration;

/// A caching wrapper for stream resolvers
pub struct CachedStreamResolver<R>
where
    R: StreamResolver,
{
    resolver: R,
    session: SessionCache<ResolvedVideo>,
}

impl<R> CachedStreamResolver<R>
where
    R: StreamResolver,
{
    /// Wraps `resolver`, keeping results for `ttl`.
    pub fn new(resolver: R, ttl: Duration) -> Self {
        Self {
            resolver,
            session: SessionCache::new(ttl),
        }
    }

    fn cache_key(program_id: &str, language: Language) -> String {
        format!("{}_{}", language.code(), program_id)
    }
}

impl<R> StreamResolver for CachedStreamResolver<R>
where
    R: StreamResolver,
{
    fn resolve(&self, program_id: &str, language: Language) -> Result<ResolvedVideo, ResolveError> {
        let cache_key = Self::cache_key(program_id, language);

        if let Some(resolved) = self.session.get(&cache_key) {
            // The rights window may have closed since the entry was cached
            let expired = resolved
                .available_until
                .is_some_and(|until| until <= Utc::now());
            if !expired {
                tracing::debug!(program_id, "streams served from session cache");
                return Ok(resolved);
            }
            self.session.invalidate(&cache_key);
        }

        let resolved = self.resolver.resolve(program_id, language)?;
        self.session.insert(&cache_key, resolved.clone());
        Ok(resolved)
    }
}
