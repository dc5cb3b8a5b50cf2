//! Static mapping from servo ids to CAN buses and joint names.

use std::collections::BTreeMap;

/// Errors raised while building a [`ServoLayout`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("duplicate servo id: {0}")]
    DuplicateServo(i32),

    #[error("joint {joint} is already driven by servo {servo_id}")]
    DuplicateJoint { joint: String, servo_id: i32 },
}

// ---------------------------------------------------------------------------
// ServoLayout
// ---------------------------------------------------------------------------

/// Servo id → (bus id, joint name), ordered by servo id.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServoLayout {
    servo_bus_map: BTreeMap<i32, i32>,
    servo_joint_map: BTreeMap<i32, String>,
}

impl ServoLayout {
    pub const fn new() -> Self {
        Self {
            servo_bus_map: BTreeMap::new(),
            servo_joint_map: BTreeMap::new(),
        }
    }

    /// Register a servo. Servo ids and joint names must be unique.
    pub fn add_servo(
        &mut self,
        servo_id: i32,
        bus_id: i32,
        joint_name: impl Into<String>,
    ) -> Result<(), LayoutError> {
        let joint_name = joint_name.into();
        if self.servo_bus_map.contains_key(&servo_id) {
            return Err(LayoutError::DuplicateServo(servo_id));
        }
        if let Some(existing) = self.servo_id(&joint_name) {
            return Err(LayoutError::DuplicateJoint {
                joint: joint_name,
                servo_id: existing,
            });
        }
        self.servo_bus_map.insert(servo_id, bus_id);
        self.servo_joint_map.insert(servo_id, joint_name);
        Ok(())
    }

    /// Builder form of [`add_servo`](Self::add_servo).
    pub fn with_servo(
        mut self,
        servo_id: i32,
        bus_id: i32,
        joint_name: impl Into<String>,
    ) -> Result<Self, LayoutError> {
        self.add_servo(servo_id, bus_id, joint_name)?;
        Ok(self)
    }

    /// Bus of a servo.
    pub fn bus(&self, servo_id: i32) -> Option<i32> {
        self.servo_bus_map.get(&servo_id).copied()
    }

    /// Joint driven by a servo.
    pub fn joint_name(&self, servo_id: i32) -> Option<&str> {
        self.servo_joint_map.get(&servo_id).map(String::as_str)
    }

    /// Servo driving a joint.
    pub fn servo_id(&self, joint_name: &str) -> Option<i32> {
        self.servo_joint_map
            .iter()
            .find(|(_, joint)| joint.as_str() == joint_name)
            .map(|(id, _)| *id)
    }

    pub const fn servo_bus_map(&self) -> &BTreeMap<i32, i32> {
        &self.servo_bus_map
    }

    pub const fn servo_joint_map(&self) -> &BTreeMap<i32, String> {
        &self.servo_joint_map
    }

    /// `(servo_id, bus_id, joint_name)` in servo id order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &str)> {
        self.servo_joint_map.iter().map(|(id, joint)| {
            let bus = self.servo_bus_map.get(id).copied().unwrap_or_default();
            (*id, bus, joint.as_str())
        })
    }

    /// Joint names in servo id order.
    pub fn joints(&self) -> impl Iterator<Item = &str> {
        self.servo_joint_map.values().map(String::as_str)
    }

    /// Number of distinct buses.
    pub fn bus_count(&self) -> usize {
        let mut buses: Vec<i32> = self.servo_bus_map.values().copied().collect();
        buses.sort_unstable();
        buses.dedup();
        buses.len()
    }

    pub fn len(&self) -> usize {
        self.servo_joint_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servo_joint_map.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
