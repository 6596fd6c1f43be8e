//! Part instances.
//!
//! A [`PartDef`](crate::genome::PartDef) in the genome expands into one
//! [`PartState`] per radial repeat, plus a mirrored twin for off-axis
//! placements on mirrored bodies. Part states hold the per-instance runtime
//! data: sensor readings, actuator commands and the engine animation phase.

use crate::genome::{Genome, PartKind, SLOT_COUNT};
use crate::skeleton::Slot;

/// One concrete part instance anchored to an outline slot.
#[derive(Clone, Debug)]
pub struct PartState {
    pub kind: PartKind,
    /// Ring index this instance resolved to.
    pub slot_index: u32,
    /// Anchor position and outward normal in body-local coordinates.
    pub slot: Slot,
    pub tilt: f64,
    pub size: f64,
    /// Sensor channels written during sensing, read by the brain.
    pub outputs: Vec<f64>,
    /// Actuator channels written by the brain, read when the part runs.
    pub inputs: Vec<f64>,
    /// Engine animation phase, advanced with speed.
    pub anim_phase: f64,
    /// Engine speed from the most recent drive, used for upkeep cost.
    speed: f64,
}

impl PartState {
    fn new(kind: PartKind, slot_index: u32, slot: Slot, tilt: f64, size: f64) -> Self {
        Self {
            kind,
            slot_index,
            slot,
            tilt,
            size,
            outputs: vec![0.0; kind.outputs()],
            inputs: vec![0.0; kind.inputs()],
            anim_phase: 0.0,
            speed: 0.0,
        }
    }

    /// World-space position of the anchor for a body at (x, y) with the
    /// given heading and scale.
    pub fn world_position(&self, x: f64, y: f64, angle: f64, scale: f64) -> (f64, f64) {
        let (sin, cos) = angle.sin_cos();
        (
            x + (self.slot.x * cos - self.slot.y * sin) * scale,
            y + (self.slot.x * sin + self.slot.y * cos) * scale,
        )
    }

    /// World-space facing of the part (body heading + anchor normal + tilt).
    pub fn world_angle(&self, body_angle: f64) -> f64 {
        body_angle + self.slot.angle + self.tilt
    }

    /// Half-angle of an eye's vision cone.
    pub fn vision_cone(&self) -> f64 {
        std::f64::consts::PI / 6.0 * self.size
    }

    /// Run an engine from its actuator command. Returns the linear thrust
    /// and the angular velocity increment; updates the animation phase and
    /// the speed used for upkeep.
    pub fn drive(&mut self, body_angle: f64) -> (f64, f64, f64) {
        let input = self.inputs.first().copied().unwrap_or(0.0);
        let speed = (input * 100.0).clamp(0.0, 100.0);
        self.speed = speed;
        self.anim_phase += speed * 0.05;

        let power = 0.008 * speed * self.size;

        let wa = self.world_angle(body_angle);
        let fx = -wa.cos() * power;
        let fy = -wa.sin() * power;

        // Torque from the thrust expressed in body-local coordinates
        let la = self.slot.angle + self.tilt;
        let ltx = -la.cos() * power;
        let lty = -la.sin() * power;
        let torque = self.slot.x * lty - self.slot.y * ltx;

        (fx, fy, torque * 0.15)
    }

    /// Per-step upkeep contribution of this part.
    pub fn energy_cost(&self) -> f64 {
        match self.kind {
            PartKind::Eye | PartKind::Mouth => self.size,
            PartKind::Engine => self.size + self.speed / 20.0,
        }
    }

    /// Human-readable state line for inspection output.
    pub fn info(&self) -> String {
        match self.kind {
            PartKind::Eye => format!(
                "eye[{}]: r={:.2} g={:.2} b={:.2}",
                self.slot_index, self.outputs[0], self.outputs[1], self.outputs[2]
            ),
            PartKind::Mouth => {
                format!("mouth[{}]: eating={:.2}", self.slot_index, self.outputs[0])
            }
            PartKind::Engine => format!("engine[{}]: speed={:.1}", self.slot_index, self.speed),
        }
    }
}

/// Expand genome part definitions into concrete instances on the outline
/// ring. Instances are ordered sensors-first so that the brain's input and
/// output vectors can be gathered and scattered by a single pass; the sort
/// is stable so equal-arity parts keep definition order.
pub fn build_part_states(genome: &Genome, slots: &[Slot]) -> Vec<PartState> {
    let slice = SLOT_COUNT as f64 / genome.radial_repeats as f64;
    let mut states = Vec::new();

    for def in &genome.parts {
        for rep in 0..def.repeat {
            let slot_index =
                ((def.slot as f64 + rep as f64 * slice) % SLOT_COUNT as f64).floor() as u32;
            states.push(PartState::new(
                def.kind,
                slot_index,
                slots[slot_index as usize],
                def.tilt,
                def.size,
            ));

            if genome.mirror && !genome.is_on_axis(slot_index) {
                let mirrored = genome.mirror_slot(slot_index);
                states.push(PartState::new(
                    def.kind,
                    mirrored,
                    slots[mirrored as usize],
                    -def.tilt,
                    def.size,
                ));
            }
        }
    }

    states.sort_by_key(|s| -(s.kind.outputs() as i64 - s.kind.inputs() as i64));
    states
}
