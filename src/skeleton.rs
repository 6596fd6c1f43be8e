//! Procedural body-outline generation.
//!
//! Turns a genome's body segments (a set of overlapping circles, replicated
//! radially) into a ring of evenly arc-length-spaced anchor slots plus a
//! normalization scale giving the organism unit area.

use crate::genome::BodySegment;
use std::f64::consts::{PI, TAU};

/// One anchor point on the outline ring: position plus outward-normal angle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slot {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

/// A body circle placed in the organism's local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedSegment {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

/// The derived body geometry: normalized slots and segments of unit total
/// area, plus the farthest slot distance from the origin.
#[derive(Clone, Debug)]
pub struct Skeleton {
    pub slots: Vec<Slot>,
    pub segments: Vec<PlacedSegment>,
    pub max_extent: f64,
}

fn compute_centroid(segments: &[PlacedSegment]) -> (f64, f64) {
    let mut total_weight = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;

    for seg in segments {
        let weight = seg.r * seg.r;
        cx += seg.x * weight;
        cy += seg.y * weight;
        total_weight += weight;
    }

    (cx / total_weight, cy / total_weight)
}

/// Farthest ray-circle intersection from the centroid in direction `t * TAU`,
/// with the outward normal taken from the winning circle.
fn outline_point(segments: &[PlacedSegment], t: f64, cx: f64, cy: f64) -> Slot {
    let angle = t * TAU;
    let dir_x = angle.cos();
    let dir_y = angle.sin();

    let mut max_dist = 0.0;
    let mut winning = 0;

    for (i, seg) in segments.iter().enumerate() {
        let rel_x = seg.x - cx;
        let rel_y = seg.y - cy;

        let b = -2.0 * (dir_x * rel_x + dir_y * rel_y);
        let c = rel_x * rel_x + rel_y * rel_y - seg.r * seg.r;

        let discriminant = b * b - 4.0 * c;
        if discriminant >= 0.0 {
            let d = (-b + discriminant.sqrt()) / 2.0;
            if d > max_dist {
                max_dist = d;
                winning = i;
            }
        }
    }

    let px = cx + dir_x * max_dist;
    let py = cy + dir_y * max_dist;
    let seg = &segments[winning];
    let nx = px - seg.x;
    let ny = py - seg.y;
    let nlen = (nx * nx + ny * ny).sqrt();

    // Centroid coinciding with a circle center degenerates the normal;
    // fall back to the ray direction.
    let normal_angle = if nlen < 1e-9 {
        angle
    } else {
        (ny / nlen).atan2(nx / nlen)
    };

    Slot {
        x: px,
        y: py,
        angle: normal_angle,
    }
}

fn build_outline(segments: &[PlacedSegment], num_points: usize) -> (Vec<Slot>, (f64, f64)) {
    let (cx, cy) = compute_centroid(segments);
    let points = (0..num_points)
        .map(|i| outline_point(segments, i as f64 / num_points as f64, cx, cy))
        .collect();
    (points, (cx, cy))
}

/// Resample a closed polyline into `num_slots` evenly spaced points, linearly
/// interpolating position and normal angle within each edge.
fn resample_by_arc_length(hi_res: &[Slot], num_slots: usize) -> Vec<Slot> {
    let mut total_length = 0.0;
    for i in 0..hi_res.len() {
        let p0 = &hi_res[i];
        let p1 = &hi_res[(i + 1) % hi_res.len()];
        total_length += ((p1.x - p0.x).powi(2) + (p1.y - p0.y).powi(2)).sqrt();
    }

    let target_spacing = total_length / num_slots as f64;
    let mut slots = Vec::with_capacity(num_slots);

    let mut accumulated = 0.0;
    let mut next_target = 0.0;

    for i in 0..hi_res.len() {
        let p0 = &hi_res[i];
        let p1 = &hi_res[(i + 1) % hi_res.len()];
        let dx = p1.x - p0.x;
        let dy = p1.y - p0.y;
        let seg_len = (dx * dx + dy * dy).sqrt();

        while next_target <= accumulated + seg_len && slots.len() < num_slots {
            let frac = if seg_len > 0.0 {
                (next_target - accumulated) / seg_len
            } else {
                0.0
            };
            slots.push(Slot {
                x: p0.x + frac * dx,
                y: p0.y + frac * dy,
                angle: p0.angle + frac * (p1.angle - p0.angle),
            });
            next_target += target_spacing;
        }

        accumulated += seg_len;
    }

    // Rounding at the seam can leave the ring one short
    while slots.len() < num_slots {
        let last = *slots.last().unwrap_or(&Slot {
            x: 1.0,
            y: 0.0,
            angle: 0.0,
        });
        slots.push(last);
    }

    slots
}

/// Area of the lens formed by two overlapping circles of radii `r1`, `r2`
/// whose centers are `d` apart.
fn circle_overlap(r1: f64, r2: f64, d: f64) -> f64 {
    if d >= r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        return PI * r1.min(r2).powi(2);
    }

    let r1sq = r1 * r1;
    let r2sq = r2 * r2;
    let dsq = d * d;

    let a1 = r1sq * ((dsq + r1sq - r2sq) / (2.0 * d * r1)).acos();
    let a2 = r2sq * ((dsq + r2sq - r1sq) / (2.0 * d * r2)).acos();
    let a3 = 0.5 * ((r1 + r2 + d) * (-r1 + r2 + d) * (r1 - r2 + d) * (r1 + r2 - d)).sqrt();

    a1 + a2 - a3
}

/// Union area of a set of circles, approximated as the sum of circle areas
/// minus pairwise lens overlaps.
pub fn compute_area(segments: &[PlacedSegment]) -> f64 {
    let mut area = 0.0;
    for seg in segments {
        area += PI * seg.r * seg.r;
    }

    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            let dx = segments[j].x - segments[i].x;
            let dy = segments[j].y - segments[i].y;
            let d = (dx * dx + dy * dy).sqrt();
            area -= circle_overlap(segments[i].r, segments[j].r, d);
        }
    }

    area
}

/// A plain unit circle of `num_slots` evenly angled anchor points.
pub fn build_circle_slots(num_slots: usize) -> Vec<Slot> {
    (0..num_slots)
        .map(|i| {
            let angle = (i as f64 / num_slots as f64) * TAU;
            Slot {
                x: angle.cos(),
                y: angle.sin(),
                angle,
            }
        })
        .collect()
}

/// Build the normalized slot ring for a body plan.
///
/// Segments are replicated at `radial_repeats` evenly spaced rotations
/// (distance-0 segments sit on the center and are placed once), the outline
/// is sampled at 10x resolution and resampled by arc length, and everything
/// is translated to the area-weighted centroid and scaled to unit area.
pub fn build_slots(body_segments: &[BodySegment], radial_repeats: u32, num_slots: usize) -> Skeleton {
    if body_segments.is_empty() {
        let r = 1.0 / PI.sqrt();
        return Skeleton {
            slots: build_circle_slots(num_slots),
            segments: vec![PlacedSegment { x: 0.0, y: 0.0, r }],
            max_extent: r,
        };
    }

    let mut segments = Vec::new();
    for rep in 0..radial_repeats.max(1) {
        let angle = (rep as f64 / radial_repeats.max(1) as f64) * TAU;
        let (sin, cos) = angle.sin_cos();
        for s in body_segments {
            if s.distance == 0.0 && rep > 0 {
                continue;
            }
            segments.push(PlacedSegment {
                x: s.distance * cos,
                y: s.distance * sin,
                r: s.radius,
            });
        }
    }

    let area = compute_area(&segments);

    let (hi_res, (cx, cy)) = build_outline(&segments, num_slots * 10);
    let raw_slots = resample_by_arc_length(&hi_res, num_slots);

    let scale = 1.0 / area.sqrt();

    let slots: Vec<Slot> = raw_slots
        .iter()
        .map(|slot| Slot {
            x: (slot.x - cx) * scale,
            y: (slot.y - cy) * scale,
            angle: slot.angle,
        })
        .collect();

    let segments: Vec<PlacedSegment> = segments
        .iter()
        .map(|seg| PlacedSegment {
            x: (seg.x - cx) * scale,
            y: (seg.y - cy) * scale,
            r: seg.r * scale,
        })
        .collect();

    let max_extent = slots
        .iter()
        .map(|slot| (slot.x * slot.x + slot.y * slot.y).sqrt())
        .fold(0.0, f64::max);

    Skeleton {
        slots,
        segments,
        max_extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn seg(distance: f64, radius: f64) -> BodySegment {
        BodySegment { distance, radius }
    }

    #[test]
    fn test_single_circle_outline() {
        let skeleton = build_slots(&[seg(0.0, 1.0)], 1, 120);

        assert_eq!(skeleton.slots.len(), 120);
        // Unit area circle has radius 1/sqrt(pi)
        let expected = 1.0 / PI.sqrt();
        for slot in &skeleton.slots {
            let d = (slot.x * slot.x + slot.y * slot.y).sqrt();
            assert!((d - expected).abs() < 1e-3, "slot distance {} != {}", d, expected);
        }
        assert!((skeleton.max_extent - expected).abs() < 1e-3);
    }

    #[test]
    fn test_unit_area_after_normalization() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        for _ in 0..50 {
            let n = rng.gen_range(1..=4);
            let mut segments = Vec::new();
            let mut x = 0.0;
            let mut prev: f64 = 0.0;
            for i in 0..n {
                let radius = rng.gen_range(0.3..1.2);
                if i > 0 {
                    x += prev + radius - 0.5 * prev.min(radius);
                }
                segments.push(seg(x, radius));
                prev = radius;
            }
            let repeats = rng.gen_range(1..=4);

            let skeleton = build_slots(&segments, repeats, 120);
            let area = compute_area(&skeleton.segments);
            assert!(
                (area - 1.0).abs() < 1e-6,
                "normalized area {} for {} segments x{}",
                area,
                n,
                repeats
            );
        }
    }

    #[test]
    fn test_degenerate_empty_segments() {
        let skeleton = build_slots(&[], 3, 120);

        assert_eq!(skeleton.slots.len(), 120);
        assert_eq!(skeleton.segments.len(), 1);
        assert!((skeleton.segments[0].r - 1.0 / PI.sqrt()).abs() < 1e-12);
        assert!((skeleton.max_extent - 1.0 / PI.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_slots_evenly_spaced_by_arc_length() {
        let skeleton = build_slots(&[seg(0.0, 1.0), seg(1.2, 0.6)], 1, 120);

        let mut lengths = Vec::new();
        for i in 0..skeleton.slots.len() {
            let a = &skeleton.slots[i];
            let b = &skeleton.slots[(i + 1) % skeleton.slots.len()];
            lengths.push(((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt());
        }
        let mean: f64 = lengths.iter().sum::<f64>() / lengths.len() as f64;
        for len in &lengths {
            assert!((len - mean).abs() < mean * 0.5, "uneven spacing: {} vs {}", len, mean);
        }
    }

    #[test]
    fn test_circle_overlap_bounds() {
        // Disjoint
        assert_eq!(circle_overlap(1.0, 1.0, 3.0), 0.0);
        // Contained
        assert!((circle_overlap(2.0, 0.5, 0.1) - PI * 0.25).abs() < 1e-12);
        // Coincident equal circles overlap fully
        assert!((circle_overlap(1.0, 1.0, 0.0) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_distance_zero_segment_not_replicated() {
        let skeleton = build_slots(&[seg(0.0, 1.0), seg(1.0, 0.5)], 3, 120);
        // One center circle plus three replicated outer circles
        assert_eq!(skeleton.segments.len(), 4);
    }
}
