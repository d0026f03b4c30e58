//! Time-bounded cache for the schema description.
//!
//! The description is built from live introspection and reused until the
//! TTL expires. Refreshes are serialized, so concurrent callers that find the
//! slot stale wait for a single introspection and share its result.

use super::DatabaseClient;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default lifetime of a cached schema description.
pub const DEFAULT_SCHEMA_TTL: Duration = Duration::from_secs(600);

struct CachedSchema {
    description: Arc<str>,
    fetched_at: Instant,
}

/// Single-slot schema description cache.
pub struct SchemaCache {
    ttl: Duration,
    slot: Mutex<Option<CachedSchema>>,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA_TTL)
    }
}

impl SchemaCache {
    /// Creates an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached description, introspecting `db` if it is missing or stale.
    ///
    /// A failed introspection leaves the previous entry untouched and is
    /// returned to the caller.
    pub async fn get(&self, db: &dyn DatabaseClient, namespaces: &[String]) -> Result<Arc<str>> {
        // Held across the refresh: this is what makes it single-flight.
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                debug!("Schema cache hit");
                return Ok(Arc::clone(&cached.description));
            }
        }

        info!(namespaces = ?namespaces, "Refreshing schema description");
        let schema = db.introspect_schema(namespaces).await?;
        let description: Arc<str> = Arc::from(schema.format_for_llm());
        debug!(
            tables = schema.tables.len(),
            chars = description.len(),
            "Schema description cached"
        );

        *slot = Some(CachedSchema {
            description: Arc::clone(&description),
            fetched_at: Instant::now(),
        });

        Ok(description)
    }
}
