//! Ordered list of observation sources.

use servosim_core::Dictionary;
use tracing::debug;

use crate::source::Source;

/// Sources written into one observation tree, in connection order.
#[derive(Default)]
pub struct ObserverPipeline {
    sources: Vec<Box<dyn Source>>,
}

impl ObserverPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source. Later sources overwrite earlier ones sharing a
    /// prefix.
    pub fn connect_source(&mut self, source: impl Source + 'static) {
        debug!(prefix = source.prefix(), "source connected");
        self.sources.push(Box::new(source));
    }

    /// Builder form of [`connect_source`](Self::connect_source).
    #[must_use]
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.connect_source(source);
        self
    }

    /// Let every source write into `observation`.
    pub fn run(&mut self, observation: &mut Dictionary) {
        for source in &mut self.sources {
            source.write(observation);
        }
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.prefix())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for ObserverPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverPipeline")
            .field("sources", &self.prefixes().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
