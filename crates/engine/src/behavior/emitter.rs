use std::f32::consts::TAU;

use rand::Rng;

use crate::app::{world_to_screen, Camera2D, Renderer, Rgba};
use crate::entity::{Entity, EntityId};
use crate::geometry::{Rect, Vec2};

use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

const PARTICLE_SIZE_PX: i32 = 2;
const AIM_SPREAD_RADIANS: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub age_seconds: f32,
    pub lifetime_seconds: f32,
}

impl Particle {
    fn alpha(&self) -> f32 {
        (1.0 - self.age_seconds / self.lifetime_seconds).clamp(0.0, 1.0)
    }
}

/// Sprays short-lived particles from the owner's center, scattered in every
/// direction or aimed at a target. Owns its particles and draws them itself.
#[derive(Debug, Clone)]
pub struct Emitter {
    rate_per_second: f32,
    spawn_accumulator: f32,
    particle_lifetime_seconds: f32,
    particle_speed: f32,
    remaining_seconds: Option<f32>,
    max_particles: usize,
    target: Option<EntityId>,
    color: Rgba,
    particles: Vec<Particle>,
}

impl Emitter {
    pub fn new(
        rate_per_second: f32,
        particle_lifetime_seconds: f32,
        particle_speed: f32,
    ) -> Result<Self, BehaviorError> {
        if particle_lifetime_seconds <= 0.0 {
            return Err(BehaviorError::InvalidParameter {
                behavior: BehaviorKind::Emitter,
                parameter: "particle_lifetime_seconds",
                value: particle_lifetime_seconds,
            });
        }
        Ok(Self {
            rate_per_second: rate_per_second.max(0.0),
            spawn_accumulator: 0.0,
            particle_lifetime_seconds,
            particle_speed,
            remaining_seconds: None,
            max_particles: 64,
            target: None,
            color: Rgba::WHITE,
            particles: Vec::new(),
        })
    }

    /// Stops emitting after `seconds`; live particles still play out.
    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.remaining_seconds = Some(seconds);
        self
    }

    pub fn aimed_at(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn is_emitting(&self) -> bool {
        self.remaining_seconds.map_or(true, |remaining| remaining > 0.0)
    }

    fn launch_direction(&self, ctx: &mut BehaviorContext<'_>, origin: Vec2) -> Vec2 {
        let aimed = self
            .target
            .and_then(|target| ctx.entity(target).map(Entity::center))
            .map(|target| (target - origin).normalized())
            .filter(|direction| !direction.is_zero());
        match aimed {
            Some(direction) => {
                direction.rotated(ctx.rng.gen_range(-AIM_SPREAD_RADIANS..=AIM_SPREAD_RADIANS))
            }
            None => Vec2::new(1.0, 0.0).rotated(ctx.rng.gen_range(0.0..TAU)),
        }
    }
}

impl Behavior for Emitter {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Emitter
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        let dt = ctx.dt_seconds;
        for particle in &mut self.particles {
            particle.age_seconds += dt;
            particle.position += particle.velocity * dt;
        }
        self.particles
            .retain(|particle| particle.age_seconds < particle.lifetime_seconds);

        if !self.is_emitting() {
            return Ok(());
        }
        if let Some(remaining) = self.remaining_seconds.as_mut() {
            *remaining -= dt;
        }
        let Some(origin) = ctx.owner().map(Entity::center) else {
            return Ok(());
        };

        self.spawn_accumulator += self.rate_per_second * dt;
        while self.spawn_accumulator >= 1.0 {
            self.spawn_accumulator -= 1.0;
            if self.particles.len() >= self.max_particles {
                continue;
            }
            let direction = self.launch_direction(ctx, origin);
            let speed = self.particle_speed * ctx.rng.gen_range(0.5..=1.0);
            self.particles.push(Particle {
                position: origin,
                velocity: direction * speed,
                age_seconds: 0.0,
                lifetime_seconds: self.particle_lifetime_seconds,
            });
        }
        Ok(())
    }

    fn draw(&self, renderer: &mut dyn Renderer, camera: &Camera2D) {
        let Rgba(r, g, b, a) = self.color;
        for particle in &self.particles {
            let (x, y) = world_to_screen(particle.position, camera);
            let alpha = (a as f32 * particle.alpha()).round() as u8;
            renderer.fill(
                Rect::new(x, y, PARTICLE_SIZE_PX, PARTICLE_SIZE_PX),
                Rgba(r, g, b, alpha),
            );
        }
    }

    fn is_done(&self) -> bool {
        !self.is_emitting() && self.particles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{DrawCommand, RecordingRenderer};
    use crate::behavior::test_support::{Harness, DT};

    #[test]
    fn emits_at_rate_and_draws_each_particle() {
        let mut harness = Harness::new();
        let torch = harness.spawn_at("torch", 40.0, 40.0);
        let mut emitter = Emitter::new(120.0, 1.0, 30.0).expect("emitter");

        harness.step(torch, &mut emitter);
        harness.step(torch, &mut emitter);
        assert_eq!(emitter.particles().len(), 4);

        let mut renderer = RecordingRenderer::default();
        emitter.draw(&mut renderer, &Camera2D::default());
        assert_eq!(renderer.commands().len(), 4);
        assert!(renderer
            .commands()
            .iter()
            .all(|command| matches!(command, DrawCommand::Fill { .. })));
    }

    #[test]
    fn aimed_particles_head_toward_target() {
        let mut harness = Harness::new();
        let torch = harness.spawn_at("torch", 0.0, 0.0);
        let player = harness.spawn_at("player", 200.0, 0.0);
        let mut emitter = Emitter::new(60.0, 1.0, 30.0)
            .expect("emitter")
            .aimed_at(player);

        harness.step(torch, &mut emitter);
        assert_eq!(emitter.particles().len(), 1);
        assert!(emitter.particles()[0].velocity.x > 0.0);
    }

    #[test]
    fn finite_emitter_finishes_after_particles_expire() {
        let mut harness = Harness::new();
        let burst = harness.spawn_at("burst", 0.0, 0.0);
        let mut emitter = Emitter::new(60.0, DT * 2.5, 30.0)
            .expect("emitter")
            .with_duration(DT * 1.5);

        harness.step(burst, &mut emitter);
        harness.step(burst, &mut emitter);
        assert!(!emitter.is_done());
        let emitted = emitter.particles().len();
        assert_eq!(emitted, 2);

        for _ in 0..4 {
            harness.step(burst, &mut emitter);
        }
        assert!(emitter.is_done());
    }

    #[test]
    fn non_positive_lifetime_is_rejected() {
        assert!(Emitter::new(10.0, 0.0, 1.0).is_err());
    }
}
