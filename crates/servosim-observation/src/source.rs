//! Observation source trait.

use servosim_core::Dictionary;

/// Something that writes readings into an observation tree.
///
/// Sources write under their own [`prefix`](Source::prefix) and never touch
/// the rest of the tree.
pub trait Source: Send {
    /// Key of the source's output in the observation tree.
    fn prefix(&self) -> &str;

    /// Write the latest readings.
    fn write(&mut self, observation: &mut Dictionary);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
