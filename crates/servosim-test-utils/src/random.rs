//! Reproducible random command batches.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use servosim_actuator_core::{
    layout::ServoLayout,
    protocol::{PositionCommand, ServoCommand},
};

pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// A `Position` command per servo of the layout with every field drawn at
/// random: targets within a quarter turn, up to 1 rev/s, gain scales in
/// `[0, 1]` and torque caps from 0.1 to 2 N·m.
pub fn random_position_commands(layout: &ServoLayout, rng: &mut impl Rng) -> Vec<ServoCommand> {
    layout
        .iter()
        .map(|(id, _, _)| {
            let target = PositionCommand::default()
                .with_position(rng.gen_range(-0.25..0.25))
                .with_velocity(rng.gen_range(-1.0..1.0))
                .with_feedforward_torque(rng.gen_range(-0.5..0.5))
                .with_gain_scales(rng.gen_range(0.0..=1.0), rng.gen_range(0.0..=1.0))
                .with_maximum_torque(rng.gen_range(0.1..2.0));
            ServoCommand::position(id, target)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
