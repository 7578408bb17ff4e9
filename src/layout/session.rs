//! Memoized layouts for one dataset.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::LayoutError;
use crate::grant::{GrantRecord, validate_grants};

use super::engine::{LayoutEngine, LayoutMode};
use super::types::Layout;

type LayoutKey = (LayoutMode, u64, u64);

/// Caches one layout per `(mode, width, height)`. Container sizes are
/// compared bit for bit.
#[derive(Debug, Clone)]
pub struct LayoutSession {
    engine: LayoutEngine,
    grants: Vec<GrantRecord>,
    cache: HashMap<LayoutKey, Layout>,
}

impl LayoutSession {
    pub fn new(engine: LayoutEngine, grants: Vec<GrantRecord>) -> Result<Self, LayoutError> {
        validate_grants(&grants)?;
        Ok(Self {
            engine,
            grants,
            cache: HashMap::new(),
        })
    }

    pub fn grants(&self) -> &[GrantRecord] {
        &self.grants
    }

    pub fn get(&mut self, mode: LayoutMode, width: f64, height: f64) -> Result<&Layout, LayoutError> {
        match self.cache.entry((mode, width.to_bits(), height.to_bits())) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                tracing::debug!(%mode, width, height, "Layout cache miss");
                let layout = self.engine.layout(mode, &self.grants, width, height)?;
                Ok(entry.insert(layout))
            }
        }
    }

    /// Number of cached layouts.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Drop cached layouts, e.g. after the container was resized for good.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
