//! In-memory distribution provider

use super::{DistributionMetadata, DistributionProvider};
use crate::requirement::canonicalize_name;
use std::collections::HashMap;

/// A fixed set of distributions, keyed by canonical name
#[derive(Debug, Clone, Default)]
pub struct InMemoryDistributions {
    distributions: HashMap<String, DistributionMetadata>,
}

impl InMemoryDistributions {
    /// Creates an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a distribution with no requirements (builder pattern)
    pub fn with_distribution(self, name: &str, version: &str) -> Self {
        self.with_metadata(DistributionMetadata::new(name, version))
    }

    /// Adds full metadata (builder pattern)
    pub fn with_metadata(mut self, metadata: DistributionMetadata) -> Self {
        self.insert(metadata);
        self
    }

    /// Adds or replaces a distribution
    pub fn insert(&mut self, metadata: DistributionMetadata) {
        self.distributions
            .insert(canonicalize_name(&metadata.name), metadata);
    }

    /// Number of distributions
    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    /// True if no distribution is present
    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }
}

impl DistributionProvider for InMemoryDistributions {
    fn metadata(&self, name: &str) -> Option<DistributionMetadata> {
        self.distributions.get(&canonicalize_name(name)).cloned()
    }
}
