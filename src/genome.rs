//! Heritable body plans.
//!
//! A genome carries the radial/bilateral symmetry of an organism, its body
//! segments, its part placements and an owned brain sized to the part layout.
//! Mutation jitters the structure; validation rejects body plans that are
//! disconnected, engulfed or missing a required part kind.

use crate::neural::NeuralNet;
use crate::util::randn;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of discrete anchor positions around the outline ring.
pub const SLOT_COUNT: u32 = 120;

/// Errors raised at the genome import/validation boundary.
#[derive(Debug)]
pub enum GenomeError {
    /// The body plan failed structural validation.
    InvalidBodyPlan,
    /// The network dimensions do not match the part layout.
    NetSizeMismatch { expected: (usize, usize), found: (usize, usize) },
    /// The document could not be parsed.
    Json(serde_json::Error),
}

impl std::fmt::Display for GenomeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBodyPlan => write!(f, "genome failed body-plan validation"),
            Self::NetSizeMismatch { expected, found } => write!(
                f,
                "network sized {}x{} does not match part layout ({}x{})",
                found.0, found.1, expected.0, expected.1
            ),
            Self::Json(e) => write!(f, "malformed genome document: {}", e),
        }
    }
}

impl std::error::Error for GenomeError {}

impl From<serde_json::Error> for GenomeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// The three functional part kinds. Eyes and mouths are sensors (outputs
/// feed the brain), engines are actuators (driven by brain outputs).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    Eye,
    Mouth,
    Engine,
}

impl PartKind {
    /// Sensor channels this kind feeds into the brain.
    pub fn outputs(self) -> usize {
        match self {
            Self::Eye => 3,
            Self::Mouth => 1,
            Self::Engine => 0,
        }
    }

    /// Actuator channels this kind reads from the brain.
    pub fn inputs(self) -> usize {
        match self {
            Self::Eye | Self::Mouth => 0,
            Self::Engine => 1,
        }
    }
}

/// One body circle: distance from the first segment along the body axis,
/// plus its radius.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodySegment {
    pub distance: f64,
    pub radius: f64,
}

impl BodySegment {
    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, rng: &mut R) {
        if rng.gen::<f64>() < rate {
            self.distance = (self.distance + randn(rng) * 0.1).clamp(0.0, 3.0);
        }
        if rng.gen::<f64>() < rate {
            self.radius = (self.radius + randn(rng) * 0.1).clamp(0.2, 1.5);
        }
    }
}

/// A part placement: kind, anchor slot, per-arc repeat count, mounting tilt
/// and size factor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartDef {
    #[serde(rename = "type")]
    pub kind: PartKind,
    pub slot: u32,
    pub repeat: u32,
    pub tilt: f64,
    pub size: f64,
}

impl PartDef {
    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, rng: &mut R) {
        if rng.gen::<f64>() < rate {
            let step = (randn(rng) * 3.0).floor() as i64;
            self.slot = (self.slot as i64 + step).rem_euclid(SLOT_COUNT as i64) as u32;
        }
        if rng.gen::<f64>() < rate {
            self.tilt += randn(rng) * 0.12;
        }
        if rng.gen::<f64>() < rate {
            self.size = (self.size + randn(rng) * 0.1).clamp(0.5, 2.0);
        }
    }
}

/// Heritable encoding of an animal's body plan and brain.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "GenomeDoc", into = "GenomeDoc")]
pub struct Genome {
    pub radial_repeats: u32,
    pub mirror: bool,
    pub body_segments: Vec<BodySegment>,
    pub parts: Vec<PartDef>,
    pub hue: f64,
    pub max_energy: f64,
    pub mutation_rate: f64,
    pub net: Option<NeuralNet>,
}

/// Genome exchange document (spec-defined JSON shape).
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenomeDoc {
    radial_repeats: u32,
    mirror: bool,
    body_segments: Vec<BodySegment>,
    parts: Vec<PartDef>,
    hue: f64,
    max_energy: f64,
    mutation_rate: f64,
    net: Option<NeuralNet>,
}

impl From<GenomeDoc> for Genome {
    fn from(doc: GenomeDoc) -> Self {
        let mut g = Genome::new(
            doc.radial_repeats,
            doc.mirror,
            doc.body_segments,
            doc.parts,
            doc.hue,
            doc.max_energy,
            doc.mutation_rate,
        );
        g.net = doc.net;
        g
    }
}

impl From<Genome> for GenomeDoc {
    fn from(g: Genome) -> Self {
        Self {
            radial_repeats: g.radial_repeats,
            mirror: g.mirror,
            body_segments: g.body_segments,
            parts: g.parts,
            hue: g.hue,
            max_energy: g.max_energy,
            mutation_rate: g.mutation_rate,
            net: g.net,
        }
    }
}

impl Genome {
    /// Construct a genome. Segments are sorted ascending by distance and the
    /// first segment's distance is normalized to zero.
    pub fn new(
        radial_repeats: u32,
        mirror: bool,
        mut body_segments: Vec<BodySegment>,
        parts: Vec<PartDef>,
        hue: f64,
        max_energy: f64,
        mutation_rate: f64,
    ) -> Self {
        body_segments.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        if let Some(first) = body_segments.first() {
            let offset = first.distance;
            for seg in &mut body_segments {
                seg.distance = (seg.distance - offset).abs();
            }
        }

        Self {
            radial_repeats,
            mirror,
            body_segments,
            parts,
            hue,
            max_energy,
            mutation_rate,
            net: None,
        }
    }

    /// Slots per radial arc.
    fn slice_size(&self) -> f64 {
        SLOT_COUNT as f64 / self.radial_repeats as f64
    }

    /// Whether a slot sits on a symmetry axis (arc start, or arc midline
    /// when mirrored). On-axis parts have no mirrored duplicate.
    pub fn is_on_axis(&self, slot: u32) -> bool {
        let slice = self.slice_size();
        let pos = slot as f64 % slice;
        pos == 0.0 || (self.mirror && pos == slice / 2.0)
    }

    /// Reflect a slot across its arc's midline.
    pub fn mirror_slot(&self, slot: u32) -> u32 {
        let slice = self.slice_size();
        let pos = slot as f64 % slice;
        ((slot as f64 - pos) + (slice - pos)).round() as u32 % SLOT_COUNT
    }

    /// Network dimensions implied by the part layout: inputs are the sum of
    /// all part-instance sensor channels, outputs the sum of all actuator
    /// channels, counting mirrored duplicates.
    pub fn calculate_net_size(&self) -> (usize, usize) {
        let mut inputs = 0;
        let mut outputs = 0;
        let slice = self.slice_size();

        for def in &self.parts {
            for rep in 0..def.repeat {
                let slot_index = ((def.slot as f64 + rep as f64 * slice) % SLOT_COUNT as f64)
                    .floor() as u32;
                inputs += def.kind.outputs();
                outputs += def.kind.inputs();
                if self.mirror && !self.is_on_axis(slot_index) {
                    inputs += def.kind.outputs();
                    outputs += def.kind.inputs();
                }
            }
        }

        (inputs, outputs)
    }

    /// Build the owned network, sized to the part layout with a hidden layer
    /// of half the total channel count.
    pub fn build_net<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let (inputs, outputs) = self.calculate_net_size();
        let hidden = (inputs + outputs + 1) / 2;
        self.net = Some(NeuralNet::new(inputs.max(1), hidden, outputs.max(1), rng));
    }

    /// Clone with structural mutation. Every segment and part is re-rolled
    /// against the mutation rate; the network is cloned verbatim. With lower
    /// probability the mutation rate itself, the energy cap and the hue are
    /// also perturbed.
    pub fn clone_mutated<R: Rng + ?Sized>(&self, rng: &mut R) -> Genome {
        let rate = self.mutation_rate;

        let mut segments = self.body_segments.clone();
        for seg in &mut segments {
            seg.mutate(rate, rng);
        }
        let mut parts = self.parts.clone();
        for part in &mut parts {
            part.mutate(rate, rng);
        }

        let mut g = Genome::new(
            self.radial_repeats,
            self.mirror,
            segments,
            parts,
            self.hue,
            self.max_energy,
            self.mutation_rate,
        );
        g.net = self.net.clone();

        if rng.gen::<f64>() < rate * 0.3 {
            g.mutation_rate = (g.mutation_rate * (1.0 + randn(rng) * 0.15)).clamp(0.001, 0.25);
        }
        if rng.gen::<f64>() < rate {
            g.max_energy = (g.max_energy + randn(rng) * 180.0).clamp(500.0, 8000.0);
        }
        if rng.gen::<f64>() < rate {
            g.hue = (g.hue + randn(rng) * 10.0).rem_euclid(360.0);
        }

        g
    }

    /// Structural validation. Rejects empty or out-of-bounds segment lists,
    /// engulfed segments, disconnected body plans (flood fill from segment
    /// 0), symmetry orders that do not divide the slot ring, and part lists
    /// missing any required kind.
    pub fn validate(&self) -> bool {
        if self.body_segments.is_empty() {
            return false;
        }
        if self.radial_repeats == 0 || SLOT_COUNT % self.radial_repeats != 0 {
            return false;
        }

        for seg in &self.body_segments {
            if seg.radius < 0.2 || seg.distance < 0.0 || seg.distance > 3.0 {
                return false;
            }
        }

        if self.body_segments.len() > 1 {
            let n = self.body_segments.len();
            let mut adjacent = vec![Vec::new(); n];

            for i in 0..n {
                for j in (i + 1)..n {
                    let a = &self.body_segments[i];
                    let b = &self.body_segments[j];
                    let dist = (a.distance - b.distance).abs();

                    let smaller = a.radius.min(b.radius);
                    let larger = a.radius.max(b.radius);
                    if dist + smaller < larger + smaller * 0.5 {
                        // One segment would engulf the other
                        return false;
                    }

                    if dist < a.radius + b.radius {
                        adjacent[i].push(j);
                        adjacent[j].push(i);
                    }
                }
            }

            let mut visited = vec![false; n];
            visited[0] = true;
            let mut queue = vec![0];
            while let Some(i) = queue.pop() {
                for &j in &adjacent[i] {
                    if !visited[j] {
                        visited[j] = true;
                        queue.push(j);
                    }
                }
            }

            if visited.iter().any(|v| !v) {
                return false;
            }
        }

        let has_eye = self.parts.iter().any(|p| p.kind == PartKind::Eye);
        let has_mouth = self.parts.iter().any(|p| p.kind == PartKind::Mouth);
        let has_engine = self.parts.iter().any(|p| p.kind == PartKind::Engine);
        has_eye && has_mouth && has_engine
    }

    /// Parse a genome exchange document, rejecting invalid body plans and
    /// networks whose dimensions disagree with the part layout.
    pub fn from_json_str(text: &str) -> Result<Genome, GenomeError> {
        let genome: Genome = serde_json::from_str(text)?;
        if !genome.validate() {
            return Err(GenomeError::InvalidBodyPlan);
        }
        if let Some(net) = &genome.net {
            let expected = genome.calculate_net_size();
            let found = (net.input_size, net.output_size);
            if found != (expected.0.max(1), expected.1.max(1)) {
                return Err(GenomeError::NetSizeMismatch { expected, found });
            }
        }
        Ok(genome)
    }

    /// Serialize to the genome exchange document.
    pub fn to_json_string(&self) -> Result<String, GenomeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A simple bilaterally symmetric two-segment starter body.
    pub fn create_default<R: Rng + ?Sized>(rng: &mut R) -> Genome {
        let parts = vec![
            PartDef { kind: PartKind::Eye, slot: 10, repeat: 1, tilt: -0.6, size: 1.0 },
            PartDef { kind: PartKind::Mouth, slot: 0, repeat: 1, tilt: 0.0, size: 1.0 },
            PartDef { kind: PartKind::Engine, slot: 50, repeat: 1, tilt: 0.3, size: 1.0 },
            PartDef { kind: PartKind::Engine, slot: 60, repeat: 1, tilt: 0.0, size: 1.0 },
        ];
        let segments = vec![
            BodySegment { distance: 0.0, radius: 1.0 },
            BodySegment { distance: 1.2, radius: 0.6 },
        ];

        let mut g = Genome::new(1, true, segments, parts, 0.8, 2000.0, 0.05);
        g.build_net(rng);
        g
    }

    /// A three-fold radially symmetric starter body.
    pub fn create_triple<R: Rng + ?Sized>(rng: &mut R) -> Genome {
        let parts = vec![
            PartDef { kind: PartKind::Eye, slot: 0, repeat: 3, tilt: 0.0, size: 1.0 },
            PartDef { kind: PartKind::Mouth, slot: 20, repeat: 3, tilt: 0.0, size: 1.0 },
            PartDef { kind: PartKind::Engine, slot: 10, repeat: 3, tilt: 0.3, size: 1.0 },
        ];
        let segments = vec![
            BodySegment { distance: 0.0, radius: 0.8 },
            BodySegment { distance: 0.6, radius: 0.5 },
        ];

        let mut g = Genome::new(3, false, segments, parts, 240.0, 2000.0, 0.25);
        g.build_net(rng);
        g
    }

    fn pick_radial_repeats<R: Rng + ?Sized>(rng: &mut R) -> u32 {
        let r = rng.gen::<f64>();
        if r < 0.6 {
            2
        } else if r < 0.7 {
            3
        } else if r < 0.9 {
            4
        } else if r < 0.95 {
            5
        } else {
            6
        }
    }

    /// Generate a random body plan. The result is not guaranteed to pass
    /// [`Genome::validate`]; callers skip or retry on failure.
    pub fn create_random<R: Rng + ?Sized>(rng: &mut R) -> Genome {
        let radial_repeats = Self::pick_radial_repeats(rng);
        let mirror = rng.gen::<f64>() < 1.0 - radial_repeats as f64 * 0.15;

        let num_segments = 1 + rng.gen_range(0..3);
        let mut body_segments = Vec::with_capacity(num_segments);
        let mut x = 0.0;
        let mut prev_radius: f64 = 0.0;
        for i in 0..num_segments {
            let radius = 0.4 + rng.gen::<f64>() * 0.6;
            if i > 0 {
                let overlap = (0.3 + rng.gen::<f64>() * 0.4) * radius.min(prev_radius);
                x += prev_radius + radius - overlap;
            }
            body_segments.push(BodySegment { distance: x, radius });
            prev_radius = radius;
        }

        // Partition the radial repeats into part groups
        let mut groups = Vec::new();
        let mut remaining = radial_repeats;
        while remaining > 0 {
            let size = (1 + rng.gen_range(0..remaining)).min(remaining);
            groups.push(size);
            remaining -= size;
        }

        let slice = SLOT_COUNT as f64 / radial_repeats as f64;
        let mirror_axis = (slice / 2.0).floor() as u32;
        let max_slot = if mirror { mirror_axis } else { slice as u32 };

        let mut parts = Vec::new();
        for kind in [PartKind::Eye, PartKind::Mouth, PartKind::Engine] {
            let mut budget = 1 + rng.gen_range(0..4) as i64;
            while budget > 0 {
                let group = groups[rng.gen_range(0..groups.len())];
                let mut slot = rng.gen_range(0..max_slot.max(1));
                let tilt = (rng.gen::<f64>() - 0.5) * 0.6;
                let size = 0.8 + rng.gen::<f64>() * 0.4;

                // Snap placements near a symmetry axis onto it
                let axis_threshold = 3;
                if slot <= axis_threshold {
                    slot = 0;
                } else if mirror && slot.abs_diff(mirror_axis) <= axis_threshold {
                    slot = mirror_axis;
                }

                let on_axis = slot == 0 || (mirror && slot == mirror_axis);
                let actual_count = group as i64 * if mirror && !on_axis { 2 } else { 1 };

                parts.push(PartDef { kind, slot, repeat: group, tilt, size });
                budget -= actual_count;
            }
        }

        let hue = rng.gen::<f64>() * 360.0;
        let mut g = Genome::new(
            radial_repeats,
            mirror,
            body_segments,
            parts,
            hue,
            1500.0 + rng.gen::<f64>() * 1000.0,
            0.03 + rng.gen::<f64>() * 0.04,
        );
        g.build_net(rng);
        g
    }
}
