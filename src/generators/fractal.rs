//! Audio-driven branching tree.
//!
//! Only the parameters persist between frames. The tree is rebuilt every
//! frame by an explicit-stack traversal whose depth never exceeds
//! `FractalParams::max_depth`, so the per-frame work is bounded no matter
//! what the treble level asks for.

use std::f32::consts::{FRAC_PI_4, PI};

use glam::Vec2;
use rand::Rng;

use crate::analysis::FeatureSnapshot;
use crate::canvas::{Layer, Rgba};
use crate::params::FractalParams;

/// One drawn branch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchSegment {
    pub start: Vec2,
    pub end: Vec2,
    /// Remaining depth at this segment (the trunk has the full depth)
    pub depth: u32,
    /// Hue in turns
    pub hue: f32,
    /// Line width (pixels)
    pub thickness: f32,
}

/// Branch waiting on the traversal stack
struct PendingBranch {
    start: Vec2,
    heading: f32,
    length: f32,
    depth: u32,
}

pub struct FractalTree {
    params: FractalParams,
    hue: f32,
    length: f32,
    depth: u32,
    chaos: f32,
    spread: f32,
}

impl FractalTree {
    pub fn new(params: FractalParams) -> Self {
        Self {
            hue: 0.0,
            length: params.base_length,
            depth: params.min_depth.min(params.max_depth),
            chaos: 0.0,
            spread: params.base_spread,
            params,
        }
    }

    /// Derive this frame's parameters from the snapshot
    pub fn update(&mut self, snapshot: &FeatureSnapshot) {
        let p = &self.params;
        self.hue = (self.hue + snapshot.bass * p.bass_hue_rate).rem_euclid(1.0);
        self.length = p.base_length + snapshot.mid * p.mid_length_scale;
        let depth = p.min_depth + (snapshot.treble * p.treble_depth_scale).floor() as u32;
        self.depth = depth.min(p.max_depth);
        self.chaos = snapshot.energy * p.energy_chaos_scale;
        self.spread = p.base_spread + snapshot.mid * p.mid_spread_scale;
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    /// Override the depth, still clamped to the hard maximum
    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth.min(self.params.max_depth);
    }

    /// Generate this frame's branches from `origin`, trunk pointing at `heading` radians
    pub fn segments<R: Rng + ?Sized>(&self, origin: Vec2, heading: f32, rng: &mut R) -> Vec<BranchSegment> {
        let total_depth = self.depth;
        let mut segments = Vec::new();
        if total_depth == 0 {
            return segments;
        }

        let mut stack = vec![PendingBranch {
            start: origin,
            heading,
            length: self.length,
            depth: total_depth,
        }];

        while let Some(branch) = stack.pop() {
            let angle = branch.heading + (rng.gen::<f32>() - 0.5) * self.chaos;
            let length = branch.length * (1.0 + (rng.gen::<f32>() - 0.5) * self.chaos * 0.2);
            let end = branch.start + Vec2::from_angle(angle) * length;

            let thickness = (3.0 * branch.depth as f32 / total_depth as f32 + 1.0)
                .floor()
                .max(1.0);
            segments.push(BranchSegment {
                start: branch.start,
                end,
                depth: branch.depth,
                hue: (self.hue + branch.depth as f32 * self.params.depth_hue_step).rem_euclid(1.0),
                thickness,
            });

            if branch.depth == 1 {
                continue;
            }

            let children = self.params.branching.at_depth(branch.depth);
            let child_length = length * self.spread;
            for i in 0..children {
                // Fan across a quarter turn centred on the parent heading
                let fan = if children > 1 {
                    i as f32 * PI / (children - 1) as f32 / 2.0
                } else {
                    FRAC_PI_4
                };
                let jitter = (rng.gen::<f32>() - 0.5) * self.chaos * 0.5;
                stack.push(PendingBranch {
                    start: end,
                    heading: angle - FRAC_PI_4 + fan + jitter,
                    length: child_length,
                    depth: branch.depth - 1,
                });
            }
        }

        segments
    }

    /// Draw this frame's tree: a line per segment plus a glowing joint
    pub fn draw<R: Rng + ?Sized>(&self, layer: &mut Layer, origin: Vec2, heading: f32, rng: &mut R) {
        for segment in self.segments(origin, heading, rng) {
            let color = Rgba::from_hsv(segment.hue, 1.0, 1.0, 255);
            layer.line(segment.start, segment.end, segment.thickness, color);
            layer.fill_circle(segment.end, segment.thickness * 2.0, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BranchCount;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed_tree(branches: usize) -> FractalTree {
        FractalTree::new(FractalParams {
            branching: BranchCount::Fixed(branches),
            ..FractalParams::default()
        })
    }

    #[test]
    fn test_depth_zero_draws_nothing() {
        let mut tree = fixed_tree(3);
        tree.set_depth(0);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(tree.segments(Vec2::ZERO, 0.0, &mut rng).is_empty());
    }

    #[test]
    fn test_segment_count_is_geometric_sum() {
        let mut rng = StdRng::seed_from_u64(1);
        for (branches, depth, expected) in [(3, 1, 1), (3, 3, 13), (2, 5, 31), (4, 4, 85)] {
            let mut tree = fixed_tree(branches);
            tree.set_depth(depth);
            let segments = tree.segments(Vec2::ZERO, 0.0, &mut rng);
            assert_eq!(segments.len(), expected, "b={} d={}", branches, depth);
        }
    }

    #[test]
    fn test_depth_is_clamped_to_maximum() {
        let mut tree = fixed_tree(2);
        tree.set_depth(40);
        assert_eq!(tree.depth(), 8);

        let loud = FeatureSnapshot {
            treble: 1.0,
            ..FeatureSnapshot::default()
        };
        let mut tree = FractalTree::new(FractalParams {
            treble_depth_scale: 100.0,
            ..FractalParams::default()
        });
        tree.update(&loud);
        assert_eq!(tree.depth(), 8);
    }

    #[test]
    fn test_update_derives_parameters() {
        let mut tree = FractalTree::new(FractalParams::default());
        let snapshot = FeatureSnapshot {
            bass: 0.5,
            mid: 0.5,
            treble: 0.5,
            energy: 0.5,
            transient: 0.0,
        };
        tree.update(&snapshot);

        assert_eq!(tree.length(), 200.0);
        assert_eq!(tree.depth(), 5);
        assert!((tree.hue() - 0.015).abs() < 1e-6);
    }

    #[test]
    fn test_silent_tree_is_deterministic_and_connected() {
        let mut tree = fixed_tree(2);
        tree.set_depth(3);
        let origin = Vec2::new(100.0, 100.0);

        let a = tree.segments(origin, 0.0, &mut StdRng::seed_from_u64(1));
        let b = tree.segments(origin, 0.0, &mut StdRng::seed_from_u64(99));
        // Zero chaos: geometry ignores the random source
        assert_eq!(a, b);

        let trunk = a[0];
        assert_eq!(trunk.start, origin);
        assert!((trunk.end - Vec2::new(200.0, 100.0)).length() < 1e-3);
        assert!(a[1..].iter().filter(|s| s.depth == 2).all(|s| s.start == trunk.end));
    }

    #[test]
    fn test_thickness_shrinks_with_depth() {
        let mut tree = fixed_tree(2);
        tree.set_depth(4);
        let segments = tree.segments(Vec2::ZERO, 0.0, &mut StdRng::seed_from_u64(1));

        assert_eq!(segments[0].thickness, 4.0);
        let leaf = segments.iter().find(|s| s.depth == 1).unwrap();
        assert_eq!(leaf.thickness, 1.0);
    }
}
