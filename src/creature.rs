//! Creatures: plants and animals.
//!
//! Both share position, velocity and an energy store. Plants photosynthesize
//! and split when full. Animals carry a genome, a grown body outline, part
//! instances and a brain; their behavior is driven each step by the world's
//! sense/think/act cycle.

use crate::config::Config;
use crate::genome::{Genome, SLOT_COUNT};
use crate::neural::NeuralNet;
use crate::parts::{build_part_states, PartState};
use crate::skeleton::{build_slots, PlacedSegment, Slot};
use crate::util::{color_from_hue, randn};
use rand::Rng;
use std::f64::consts::{PI, TAU};

pub const PLANT_START_ENERGY: f64 = 100.0;
pub const PLANT_MAX_ENERGY: f64 = 160.0;
pub const ANIMAL_START_ENERGY: f64 = 1250.0;

/// Runtime state of an animal body, grown from its genome.
#[derive(Clone, Debug)]
pub struct Animal {
    pub genome: Genome,
    pub angle: f64,
    pub angular_velocity: f64,
    /// Outline anchors in body-local coordinates, unit body area.
    pub slots: Vec<Slot>,
    /// Placed body circles in body-local coordinates.
    pub body_segments: Vec<PlacedSegment>,
    /// Largest slot distance from the body origin.
    pub max_extent: f64,
    pub part_states: Vec<PartState>,
    /// Steps left before the animal may act again.
    pub stun_count: u32,
    /// Steps left in the current brain-noise trial.
    pub noise_countdown: u32,
    /// Pre-noise brain, restored if the trial loses energy.
    pub saved_net: Option<NeuralNet>,
    pub energy_at_noise_start: f64,
}

impl Animal {
    /// Concatenated sensor readings in part-state order.
    pub fn gather_inputs(&self) -> Vec<f64> {
        let mut inputs = Vec::new();
        for state in &self.part_states {
            inputs.extend_from_slice(&state.outputs);
        }
        inputs
    }

    /// Distribute brain outputs to actuator channels in part-state order.
    /// Missing outputs read as zero.
    pub fn scatter_outputs(&mut self, outputs: &[f64]) {
        let mut idx = 0;
        for state in &mut self.part_states {
            for input in &mut state.inputs {
                *input = outputs.get(idx).copied().unwrap_or(0.0);
                idx += 1;
            }
        }
    }

    /// Trial-and-error brain noise. Every 100 steps the brain is perturbed;
    /// if the trial ends with no energy gained the previous brain is
    /// restored.
    pub fn explore<R: Rng + ?Sized>(&mut self, energy: f64, rng: &mut R) {
        if self.noise_countdown > 0 {
            self.noise_countdown -= 1;
            if self.noise_countdown == 0 {
                if energy <= self.energy_at_noise_start {
                    if let Some(saved) = self.saved_net.take() {
                        self.genome.net = Some(saved);
                    }
                }
                self.saved_net = None;
            }
        } else if let Some(net) = &mut self.genome.net {
            self.saved_net = Some(net.clone());
            self.energy_at_noise_start = energy;
            net.mutate(1.0, rng);
            self.noise_countdown = 100;
        }
    }

    /// Sum of part upkeep contributions.
    pub fn parts_energy_cost(&self) -> f64 {
        self.part_states.iter().map(|s| s.energy_cost()).sum()
    }
}

/// Variant data distinguishing plants from animals.
#[derive(Clone, Debug)]
pub enum CreatureKind {
    Plant,
    Animal(Box<Animal>),
}

#[derive(Clone, Debug)]
pub struct Creature {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub energy: f64,
    /// RGB channels in 0-255.
    pub color: [f64; 3],
    pub kind: CreatureKind,
}

impl Creature {
    /// Create a plant with a random green hue.
    pub fn plant<R: Rng + ?Sized>(id: u64, x: f64, y: f64, rng: &mut R) -> Creature {
        let hue = rng.gen_range(80.0..120.0);
        Creature {
            id,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            energy: PLANT_START_ENERGY,
            color: color_from_hue(hue, 60.0, 40.0),
            kind: CreatureKind::Plant,
        }
    }

    /// Grow an animal from a genome: build the outline, expand part
    /// instances and ensure the genome carries a brain sized to them.
    pub fn animal<R: Rng + ?Sized>(
        id: u64,
        x: f64,
        y: f64,
        mut genome: Genome,
        rng: &mut R,
    ) -> Creature {
        // Mutation can move a part on or off a symmetry axis, changing the
        // instance count; a brain sized for the parent layout must not be
        // fed the child's channel vectors.
        let (inputs, outputs) = genome.calculate_net_size();
        let stale = match &genome.net {
            Some(net) => (net.input_size, net.output_size) != (inputs.max(1), outputs.max(1)),
            None => true,
        };
        if stale {
            genome.build_net(rng);
        }

        let skeleton = build_slots(&genome.body_segments, genome.radial_repeats, SLOT_COUNT as usize);
        let part_states = build_part_states(&genome, &skeleton.slots);
        let color = color_from_hue(genome.hue, 60.0, 40.0);
        let angle = rng.gen::<f64>() * TAU;

        Creature {
            id,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            energy: ANIMAL_START_ENERGY,
            color,
            kind: CreatureKind::Animal(Box::new(Animal {
                genome,
                angle,
                angular_velocity: 0.0,
                slots: skeleton.slots,
                body_segments: skeleton.segments,
                max_extent: skeleton.max_extent,
                part_states,
                stun_count: 0,
                noise_countdown: 0,
                saved_net: None,
                energy_at_noise_start: 0.0,
            })),
        }
    }

    pub fn is_plant(&self) -> bool {
        matches!(self.kind, CreatureKind::Plant)
    }

    pub fn as_animal(&self) -> Option<&Animal> {
        match &self.kind {
            CreatureKind::Animal(a) => Some(a),
            CreatureKind::Plant => None,
        }
    }

    pub fn as_animal_mut(&mut self) -> Option<&mut Animal> {
        match &mut self.kind {
            CreatureKind::Animal(a) => Some(a),
            CreatureKind::Plant => None,
        }
    }

    pub fn max_energy(&self) -> f64 {
        match &self.kind {
            CreatureKind::Plant => PLANT_MAX_ENERGY,
            CreatureKind::Animal(a) => a.genome.max_energy,
        }
    }

    /// Body-to-world scale factor for animals; the energy disc otherwise.
    pub fn scale(&self) -> f64 {
        match &self.kind {
            CreatureKind::Plant => self.energy.max(0.0).sqrt(),
            CreatureKind::Animal(_) => (self.energy * PI).max(0.0).sqrt(),
        }
    }

    /// Bounding radius, recomputed from current energy.
    pub fn radius(&self) -> f64 {
        match &self.kind {
            CreatureKind::Plant => self.energy.max(0.0).sqrt(),
            CreatureKind::Animal(a) => self.scale() * a.max_extent,
        }
    }

    /// Body circles in world coordinates, used for fine collision and mouth
    /// probes. Plants are a single disc.
    pub fn body_circles(&self) -> Vec<PlacedSegment> {
        match &self.kind {
            CreatureKind::Plant => vec![PlacedSegment { x: self.x, y: self.y, r: self.radius() }],
            CreatureKind::Animal(a) => {
                let s = self.scale();
                let (sin, cos) = a.angle.sin_cos();
                a.body_segments
                    .iter()
                    .map(|seg| PlacedSegment {
                        x: self.x + (seg.x * cos - seg.y * sin) * s,
                        y: self.y + (seg.x * sin + seg.y * cos) * s,
                        r: seg.r * s,
                    })
                    .collect()
            }
        }
    }

    /// Per-step metabolic cost.
    pub fn living_cost(&self, config: &Config) -> f64 {
        let e = &config.energy;
        match &self.kind {
            CreatureKind::Plant => e.living_cost * e.base_creature_cost,
            CreatureKind::Animal(a) => {
                e.living_cost
                    * (e.base_creature_cost
                        + self.radius() * e.radius_cost
                        + a.parts_energy_cost() * e.parts_cost)
            }
        }
    }

    fn update_energy(&mut self, config: &Config) {
        let cost = self.living_cost(config);
        match &self.kind {
            CreatureKind::Plant => {
                let stillness = self.vx * self.vx + self.vy * self.vy + 0.2;
                self.energy += config.energy.sunlight / stillness - cost;
            }
            CreatureKind::Animal(_) => {
                self.energy -= cost;
            }
        }
    }

    /// Advance position and velocity by one step: drift, speed-squared
    /// damping, Brownian noise, centering pull, then the energy update.
    pub fn integrate<R: Rng + ?Sized>(&mut self, config: &Config, rng: &mut R) {
        let p = &config.physics;

        self.x += self.vx;
        self.y += self.vy;

        let damping = 1.0 - p.linear_damping * (self.vx * self.vx + self.vy * self.vy);
        self.vx = self.vx * damping + randn(rng) * (p.brownian_noise / 100.0);
        self.vy = self.vy * damping + randn(rng) * (p.brownian_noise / 100.0);

        self.vx -= self.x * p.gravity;
        self.vy -= self.y * p.gravity;

        if let CreatureKind::Animal(a) = &mut self.kind {
            a.angle += a.angular_velocity;
            a.angular_velocity *= 1.0 - p.angular_damping;
        }

        self.update_energy(config);
    }

    pub fn should_die(&self, config: &Config) -> bool {
        self.energy < config.energy.min_energy_fraction * self.max_energy()
    }

    pub fn should_divide(&self) -> bool {
        self.energy > self.max_energy()
    }

    /// Split in two. The parent keeps half its energy either way; an animal
    /// whose mutated genome fails validation produces no child.
    pub fn divide<R: Rng + ?Sized>(&mut self, child_id: u64, rng: &mut R) -> Option<Creature> {
        let e = self.energy * 0.5;
        self.energy = e;

        match &self.kind {
            CreatureKind::Plant => {
                let mut child = Creature::plant(
                    child_id,
                    self.x + rng.gen_range(-8.0..8.0),
                    self.y + rng.gen_range(-8.0..8.0),
                    rng,
                );
                child.energy = e;
                child.vx = self.vx;
                child.vy = self.vy;
                Some(child)
            }
            CreatureKind::Animal(a) => {
                let mutated = a.genome.clone_mutated(rng);
                if !mutated.validate() {
                    return None;
                }

                let x = self.x + self.vx + rng.gen_range(-10.0..10.0);
                let y = self.y + self.vy + rng.gen_range(-10.0..10.0);
                let parent_angle = a.angle;
                let parent_av = a.angular_velocity;

                let mut child = Creature::animal(child_id, x, y, mutated, rng);
                child.energy = e;
                child.vx = self.vx;
                child.vy = self.vy;
                if let CreatureKind::Animal(ca) = &mut child.kind {
                    ca.angle = parent_angle + PI;
                    ca.angular_velocity = parent_av;
                }
                Some(child)
            }
        }
    }

    /// Suspend an animal's actuation for the given number of steps. No-op
    /// for plants.
    pub fn stun_for(&mut self, steps: u32) {
        if let CreatureKind::Animal(a) = &mut self.kind {
            a.stun_count = steps;
        }
    }

    /// One line per part describing its latest sensor/actuator state.
    pub fn part_info(&self) -> Vec<String> {
        match &self.kind {
            CreatureKind::Plant => Vec::new(),
            CreatureKind::Animal(a) => a.part_states.iter().map(|s| s.info()).collect(),
        }
    }
}
