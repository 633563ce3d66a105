//! A small CPU particle system rendered as instanced cubes.
//!
//! Every particle is emitted from the origin of the owning drawable with a
//! random velocity, falls under gravity and is re-emitted once its lifetime
//! runs out. The whole system is drawn with one instanced draw call.

use cgmath::{InnerSpace, Rotation3};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::data_structures::instance::{Instance, InstanceRaw};

#[derive(Clone, Debug, PartialEq)]
pub struct EmitterConfig {
    pub count: usize,
    pub min_lifetime: f32,
    pub max_lifetime: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub gravity: f32,
    pub size: f32,
    /// Degrees per second every cube spins around its own axis.
    pub spin: f32,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            count: 200,
            min_lifetime: 1.0,
            max_lifetime: 4.0,
            min_speed: 10.0,
            max_speed: 40.0,
            gravity: 20.0,
            size: 1.0,
            spin: 90.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: cgmath::Vector3<f32>,
    pub velocity: cgmath::Vector3<f32>,
    pub axis: cgmath::Vector3<f32>,
    pub age: f32,
    pub lifetime: f32,
}

#[derive(Clone, Debug)]
pub struct ParticleSystem {
    pub config: EmitterConfig,
    pub paused: bool,
    particles: Vec<Particle>,
    rng: StdRng,
    respawned: u64,
}

impl ParticleSystem {
    pub fn new(config: EmitterConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic emission, mostly useful for tests.
    pub fn seeded(config: EmitterConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EmitterConfig, rng: StdRng) -> Self {
        let mut system = Self {
            particles: Vec::with_capacity(config.count),
            config,
            paused: false,
            rng,
            respawned: 0,
        };
        for _ in 0..system.config.count {
            let mut particle = system.emit();
            // Stagger the first wave so particles don't all expire together
            particle.age = system.rng.gen_range(0.0..particle.lifetime);
            system.particles.push(particle);
        }
        system
    }

    fn emit(&mut self) -> Particle {
        let config = &self.config;
        let direction = loop {
            let candidate = cgmath::Vector3::new(
                self.rng.gen_range(-1.0f32..1.0),
                self.rng.gen_range(0.0f32..1.0),
                self.rng.gen_range(-1.0f32..1.0),
            );
            let len2 = candidate.magnitude2();
            if len2 > 1e-4 && len2 <= 1.0 {
                break candidate.normalize();
            }
        };
        let speed = sample(&mut self.rng, config.min_speed, config.max_speed);
        let lifetime = sample(&mut self.rng, config.min_lifetime, config.max_lifetime).max(1e-3);
        let axis = cgmath::Vector3::new(
            self.rng.gen_range(-1.0f32..1.0),
            1.0,
            self.rng.gen_range(-1.0f32..1.0),
        )
        .normalize();
        Particle {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            velocity: direction * speed,
            axis,
            age: 0.0,
            lifetime,
        }
    }

    /// Advances all particles by `dt` seconds, re-emitting the expired ones.
    pub fn step(&mut self, dt: f32) {
        if self.paused || dt <= 0.0 {
            return;
        }
        let gravity = self.config.gravity;
        for idx in 0..self.particles.len() {
            let particle = &mut self.particles[idx];
            particle.age += dt;
            if particle.age >= particle.lifetime {
                self.particles[idx] = self.emit();
                self.respawned += 1;
                continue;
            }
            particle.velocity.y -= gravity * dt;
            particle.position += particle.velocity * dt;
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Total number of particles that expired and were emitted again.
    pub fn respawned(&self) -> u64 {
        self.respawned
    }

    pub fn instances(&self) -> Vec<InstanceRaw> {
        let size = self.config.size;
        self.particles
            .iter()
            .map(|particle| {
                Instance {
                    position: particle.position,
                    rotation: cgmath::Quaternion::from_axis_angle(
                        particle.axis,
                        cgmath::Deg(self.config.spin * particle.age),
                    ),
                    scale: cgmath::Vector3::new(size, size, size),
                }
                .to_raw()
            })
            .collect()
    }
}

fn sample(rng: &mut StdRng, min: f32, max: f32) -> f32 {
    if max > min { rng.gen_range(min..max) } else { min }
}
