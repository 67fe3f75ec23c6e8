//! Fixed pool of energy-driven particles.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::{regular_polygon, star_polygon};
use crate::canvas::{Layer, Rgba};
use crate::params::ParticleParams;

/// Overlay drawn on top of a particle's base disc
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleShape {
    Star,
    Square,
    Triangle,
    PulsingRings,
    Hexagon,
    Cross,
}

impl ParticleShape {
    pub const ALL: [Self; 6] = [
        Self::Star,
        Self::Square,
        Self::Triangle,
        Self::PulsingRings,
        Self::Hexagon,
        Self::Cross,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Position (pixels, may leave the canvas)
    pub position: Vec2,
    /// Base disc radius (pixels)
    pub size: f32,
    pub color: [u8; 3],
    pub velocity: Vec2,
    /// Remaining lifetime (frames)
    pub life: i32,
    /// Radians
    pub rotation: f32,
    pub rotation_speed: f32,
    pub shape: ParticleShape,
}

impl Particle {
    /// Fresh particle somewhere on a `bounds`-sized canvas
    pub fn spawn<R: Rng + ?Sized>(params: &ParticleParams, bounds: Vec2, rng: &mut R) -> Self {
        let speed = params.max_speed;
        let spin = params.max_rotation_speed;
        let mut channel = || rng.gen_range(params.color_range.clone());
        let color = [channel(), channel(), channel()];

        Self {
            position: Vec2::new(
                rng.gen_range(0.0..=bounds.x.max(0.0)),
                rng.gen_range(0.0..=bounds.y.max(0.0)),
            ),
            size: rng.gen_range(params.size_range.clone()) as f32,
            color,
            velocity: Vec2::new(rng.gen_range(-speed..=speed), rng.gen_range(-speed..=speed)),
            life: rng.gen_range(params.lifetime_range.clone()),
            rotation: rng.gen_range(0.0..TAU),
            rotation_speed: rng.gen_range(-spin..=spin),
            shape: ParticleShape::ALL[rng.gen_range(0..ParticleShape::ALL.len())],
        }
    }

    /// Advance one frame; returns true when the particle had to respawn
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        params: &ParticleParams,
        energy: f32,
        time_s: f32,
        bounds: Vec2,
        rng: &mut R,
    ) -> bool {
        self.position += self.velocity * energy * params.velocity_gain;

        // Chaotic drift, y uses the already-moved x
        let drift = energy * params.chaos_gain;
        self.position.x += (time_s * 2.0 + self.position.y * 0.01).sin() * drift;
        self.position.y += (time_s * 2.0 + self.position.x * 0.01).cos() * drift;

        self.rotation += self.rotation_speed * energy * params.rotation_gain;
        self.life -= 1;

        if self.life <= 0 || !self.within_margin(bounds, params.respawn_margin) {
            *self = Self::spawn(params, bounds, rng);
            return true;
        }
        false
    }

    fn within_margin(&self, bounds: Vec2, margin: f32) -> bool {
        let p = self.position;
        p.x >= -margin && p.x <= bounds.x + margin && p.y >= -margin && p.y <= bounds.y + margin
    }

    /// Alpha fading linearly with remaining life
    pub fn alpha(&self, max_lifetime: i32) -> u8 {
        let fraction = self.life as f32 / max_lifetime.max(1) as f32;
        (255.0 * fraction).clamp(0.0, 255.0) as u8
    }

    pub fn draw(&self, layer: &mut Layer, max_lifetime: i32, time_s: f32) {
        let [r, g, b] = self.color;
        let color = Rgba::new(r, g, b, self.alpha(max_lifetime));
        let center = self.position;

        layer.fill_circle(center, self.size, color);

        match self.shape {
            ParticleShape::Star => {
                let points = star_polygon(center, self.size * 2.0, self.size * 0.8, 5, self.rotation);
                layer.fill_polygon(&points, color);
            }
            ParticleShape::Square => {
                let points = regular_polygon(center, self.size * 2.0, 4, self.rotation);
                layer.fill_polygon(&points, color);
            }
            ParticleShape::Triangle => {
                let points = regular_polygon(center, self.size * 2.0, 3, self.rotation);
                layer.fill_polygon(&points, color);
            }
            ParticleShape::PulsingRings => {
                let pulse = (time_s * 5.0).sin();
                let outer_pulse = (time_s * 5.0 + 1.0).sin();
                layer.ring(center, self.size * (1.0 + pulse * 0.5), 3.0, color);
                layer.ring(center, self.size * 1.5 * (1.0 + outer_pulse * 0.5), 2.0, color);
            }
            ParticleShape::Hexagon => {
                let points = regular_polygon(center, self.size * 1.5, 6, self.rotation);
                layer.fill_polygon(&points, color);
            }
            ParticleShape::Cross => {
                let arm = self.size * 2.0;
                let half = (self.size / 2.0).floor().max(2.0);
                let vertical = [
                    center + Vec2::new(-half, -arm),
                    center + Vec2::new(half, -arm),
                    center + Vec2::new(half, arm),
                    center + Vec2::new(-half, arm),
                ];
                let horizontal = [
                    center + Vec2::new(-arm, -half),
                    center + Vec2::new(arm, -half),
                    center + Vec2::new(arm, half),
                    center + Vec2::new(-arm, half),
                ];
                layer.fill_polygon(&vertical, color);
                layer.fill_polygon(&horizontal, color);
            }
        }
    }
}

/// Constant-size particle pool
pub struct ParticleField {
    params: ParticleParams,
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn new<R: Rng + ?Sized>(params: ParticleParams, bounds: Vec2, rng: &mut R) -> Self {
        let particles = (0..params.count)
            .map(|_| Particle::spawn(&params, bounds, rng))
            .collect();
        Self { params, particles }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Move every particle; returns how many respawned
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        energy: f32,
        time_s: f32,
        bounds: Vec2,
        rng: &mut R,
    ) -> usize {
        let params = &self.params;
        self.particles
            .iter_mut()
            .map(|p| p.update(params, energy, time_s, bounds, rng))
            .filter(|&respawned| respawned)
            .count()
    }

    pub fn draw(&self, layer: &mut Layer, time_s: f32) {
        let max_lifetime = self.params.max_lifetime();
        for particle in &self.particles {
            particle.draw(layer, max_lifetime, time_s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const BOUNDS: Vec2 = Vec2::new(640.0, 480.0);

    fn still_particle(life: i32) -> Particle {
        Particle {
            position: Vec2::new(50.0, 60.0),
            size: 5.0,
            color: [200, 150, 100],
            velocity: Vec2::new(1.0, -1.0),
            life,
            rotation: 0.0,
            rotation_speed: 0.1,
            shape: ParticleShape::Square,
        }
    }

    #[test]
    fn test_spawn_respects_ranges() {
        let params = ParticleParams::default();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..500 {
            let p = Particle::spawn(&params, BOUNDS, &mut rng);
            assert!((0.0..=BOUNDS.x).contains(&p.position.x));
            assert!((0.0..=BOUNDS.y).contains(&p.position.y));
            assert!((3.0..=20.0).contains(&p.size));
            assert!(p.color.iter().all(|&c| c >= 100));
            assert!(params.lifetime_range.contains(&p.life));
            assert!(p.velocity.x.abs() <= 3.0 && p.velocity.y.abs() <= 3.0);
        }
    }

    #[test]
    fn test_expired_particle_respawns_inside_canvas() {
        let params = ParticleParams::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut particle = still_particle(1);

        let respawned = particle.update(&params, 0.0, 0.0, BOUNDS, &mut rng);
        assert!(respawned);
        assert!(particle.life >= 50);
        assert!((0.0..=BOUNDS.x).contains(&particle.position.x));
        assert!((0.0..=BOUNDS.y).contains(&particle.position.y));
    }

    #[test]
    fn test_silent_particle_only_ages() {
        let params = ParticleParams::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut particle = still_particle(10);

        assert!(!particle.update(&params, 0.0, 1.0, BOUNDS, &mut rng));
        assert_eq!(particle.position, Vec2::new(50.0, 60.0));
        assert_eq!(particle.rotation, 0.0);
        assert_eq!(particle.life, 9);
    }

    #[test]
    fn test_particle_leaving_margin_respawns() {
        let params = ParticleParams::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut particle = still_particle(100);
        particle.position = Vec2::new(-150.0, 60.0);

        assert!(particle.update(&params, 0.0, 0.0, BOUNDS, &mut rng));
        assert!(particle.position.x >= 0.0);
    }

    #[test]
    fn test_pool_size_is_constant() {
        let params = ParticleParams {
            count: 64,
            ..ParticleParams::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let mut field = ParticleField::new(params.clone(), BOUNDS, &mut rng);

        for frame in 0..300 {
            field.update(1.0, frame as f32 / 60.0, BOUNDS, &mut rng);
            assert_eq!(field.len(), 64);
            for p in field.particles() {
                assert!(p.position.x >= -params.respawn_margin);
                assert!(p.position.x <= BOUNDS.x + params.respawn_margin);
                assert!(p.life > 0);
            }
        }
    }

    #[test]
    fn test_alpha_fades_with_life() {
        assert_eq!(still_particle(200).alpha(200), 255);
        assert_eq!(still_particle(100).alpha(200), 127);
        assert_eq!(still_particle(0).alpha(200), 0);
    }

    #[test]
    fn test_every_shape_draws() {
        for shape in ParticleShape::ALL {
            let mut layer = Layer::new(100, 100).unwrap();
            let particle = Particle {
                position: Vec2::new(50.0, 50.0),
                shape,
                ..still_particle(200)
            };
            particle.draw(&mut layer, 200, 0.0);
            assert!(layer.lit_pixels() > 0, "{:?} drew nothing", shape);
        }
    }
}
