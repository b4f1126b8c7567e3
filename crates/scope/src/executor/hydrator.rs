//! Conversion of raw hits into records.

use std::fmt::Debug;

use crate::error::ScopeResult;
use crate::types::Record;

use super::RawHit;

/// Turns a raw hit into a record.
pub trait Hydrator: Send + Sync + Debug {
    /// Hydrates a single hit.
    fn from_hit(&self, hit: &RawHit) -> ScopeResult<Record>;
}

/// Uses the hit's `_source` as the record body.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceHydrator;

impl Hydrator for SourceHydrator {
    fn from_hit(&self, hit: &RawHit) -> ScopeResult<Record> {
        Ok(Record {
            id: hit.id.clone(),
            index: hit.index.clone(),
            score: hit.score,
            source: hit.source.clone(),
            highlight: hit.highlight.clone(),
        })
    }
}
