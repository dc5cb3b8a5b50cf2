//! Per-surface contact monitoring.

use std::collections::BTreeMap;

use servosim_core::Dictionary;
use servosim_physics::{backend::PhysicsBackend, error::PhysicsError};

/// Contact point counts of the monitored collision surfaces (links).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactMonitor {
    counts: BTreeMap<String, usize>,
}

impl ContactMonitor {
    pub const fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }

    /// Start counting contacts of `surface`. Counts start at zero.
    pub fn enable(&mut self, surface: impl Into<String>) {
        self.counts.entry(surface.into()).or_insert(0);
    }

    /// Stop counting contacts of `surface`.
    pub fn disable(&mut self, surface: &str) {
        self.counts.remove(surface);
    }

    pub fn is_monitored(&self, surface: &str) -> bool {
        self.counts.contains_key(surface)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Contact points of a monitored surface during the last step.
    pub fn count(&self, surface: &str) -> Option<usize> {
        self.counts.get(surface).copied()
    }

    /// Read the counts of the last step from the backend.
    pub fn refresh<B: PhysicsBackend + ?Sized>(&mut self, backend: &B) -> Result<(), PhysicsError> {
        for (surface, count) in &mut self.counts {
            *count = backend.contact_points(surface)?;
        }
        Ok(())
    }

    /// Write `contact.<surface>.num_contact_points` for every monitored
    /// surface. Nothing is written when no surface is monitored.
    pub fn write(&self, output: &mut Dictionary) {
        if self.counts.is_empty() {
            return;
        }
        let contact = output.child_mut("contact");
        for (surface, count) in &self.counts {
            contact
                .child_mut(surface)
                .insert("num_contact_points", *count);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_and_disable() {
        let mut monitor = ContactMonitor::new();
        assert!(monitor.is_empty());
        monitor.enable("left_wheel_tire");
        assert!(monitor.is_monitored("left_wheel_tire"));
        assert_eq!(monitor.count("left_wheel_tire"), Some(0));
        monitor.disable("left_wheel_tire");
        assert!(monitor.count("left_wheel_tire").is_none());
    }

    #[test]
    fn write_only_monitored_surfaces() {
        let mut output = Dictionary::new();
        ContactMonitor::new().write(&mut output);
        assert!(!output.has("contact"));

        let mut monitor = ContactMonitor::new();
        monitor.enable("right_wheel_tire");
        monitor.write(&mut output);
        let count: i64 = output.get("contact.right_wheel_tire.num_contact_points").unwrap();
        assert_eq!(count, 0);
        assert!(!output.has("contact.left_wheel_tire"));
    }
}
