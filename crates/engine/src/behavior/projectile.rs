use crate::entity::{Entity, EntityId};
use crate::events::{keys, EventPayload};
use crate::geometry::Vec2;

use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpec {
    pub texture: String,
    pub size: (i32, i32),
    pub speed: f32,
    pub damage: i32,
    pub lifetime_seconds: f32,
    /// Radians per second the projectile may turn toward its target; zero
    /// flies straight.
    pub turn_rate: f32,
}

impl Default for ProjectileSpec {
    fn default() -> Self {
        Self {
            texture: "arrow".to_string(),
            size: (6, 6),
            speed: 90.0,
            damage: 1,
            lifetime_seconds: 3.0,
            turn_rate: 0.0,
        }
    }
}

/// Fires a projectile at `target` every `interval_seconds` while it is within
/// `range`.
#[derive(Debug, Clone)]
pub struct Shoot {
    target: EntityId,
    interval_seconds: f32,
    cooldown_seconds: f32,
    range: f32,
    spec: ProjectileSpec,
}

impl Shoot {
    pub fn new(
        target: EntityId,
        interval_seconds: f32,
        range: f32,
        spec: ProjectileSpec,
    ) -> Result<Self, BehaviorError> {
        if interval_seconds <= 0.0 {
            return Err(BehaviorError::InvalidParameter {
                behavior: BehaviorKind::Shoot,
                parameter: "interval_seconds",
                value: interval_seconds,
            });
        }
        Ok(Self {
            target,
            interval_seconds,
            cooldown_seconds: interval_seconds,
            range,
            spec,
        })
    }
}

impl Behavior for Shoot {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Shoot
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        self.cooldown_seconds = (self.cooldown_seconds - ctx.dt_seconds).max(0.0);
        if self.cooldown_seconds > 0.0 {
            return Ok(());
        }
        let Some(target_center) = ctx.entity(self.target).map(Entity::center) else {
            return Ok(());
        };
        let Some((origin, from_enemy, layer)) = ctx
            .owner()
            .map(|owner| (owner.center(), owner.flags.enemy, owner.draw_layer))
        else {
            return Ok(());
        };
        let offset = target_center - origin;
        if offset.length() > self.range {
            return Ok(());
        }

        let direction = offset.normalized();
        let mut projectile = Entity::new("projectile", origin, self.spec.size);
        projectile.set_center(origin);
        projectile.texture = self.spec.texture.clone();
        projectile.damage = self.spec.damage;
        projectile.friction = 1.0;
        projectile.draw_layer = layer + 1;
        projectile.flags.can_hurt_player = from_enemy;
        projectile.flags.can_hurt_enemies = !from_enemy;
        let mut flight = Projectile::new(direction, self.spec.speed, self.spec.lifetime_seconds);
        if self.spec.turn_rate > 0.0 {
            flight = flight.with_homing(self.target, self.spec.turn_rate);
        }
        projectile.attach(Box::new(flight));
        ctx.world.spawn(projectile);
        ctx.events
            .publish(keys::PLAY_SOUND, EventPayload::Text("shoot".to_string()));

        self.cooldown_seconds = self.interval_seconds;
        Ok(())
    }
}

/// Moves the owner along `direction` at constant speed, optionally turning
/// toward a target. Removes the owner when it hits a wall or times out.
#[derive(Debug, Clone)]
pub struct Projectile {
    direction: Vec2,
    speed: f32,
    lifetime_seconds: f32,
    elapsed_seconds: f32,
    homing: Option<(EntityId, f32)>,
    done: bool,
}

impl Projectile {
    pub fn new(direction: Vec2, speed: f32, lifetime_seconds: f32) -> Self {
        Self {
            direction: direction.normalized(),
            speed,
            lifetime_seconds,
            elapsed_seconds: 0.0,
            homing: None,
            done: false,
        }
    }

    pub fn with_homing(mut self, target: EntityId, turn_rate: f32) -> Self {
        self.homing = Some((target, turn_rate));
        self
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }
}

impl Behavior for Projectile {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Projectile
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        self.elapsed_seconds += ctx.dt_seconds;
        let Some((center, colliding)) = ctx
            .owner()
            .map(|owner| (owner.center(), owner.flags.colliding))
        else {
            return Ok(());
        };
        if colliding || self.elapsed_seconds >= self.lifetime_seconds {
            ctx.despawn_owner();
            self.done = true;
            return Ok(());
        }

        if let Some((target, turn_rate)) = self.homing {
            if let Some(target_center) = ctx.entity(target).map(Entity::center) {
                let desired = (target_center - center).normalized();
                let blend = (turn_rate * ctx.dt_seconds).min(1.0);
                let steered = (self.direction + (desired - self.direction) * blend).normalized();
                if !steered.is_zero() {
                    self.direction = steered;
                }
            }
        }

        let velocity = self.direction * self.speed * ctx.dt_seconds;
        if let Some(owner) = ctx.owner_mut() {
            owner.friction = 1.0;
            owner.velocity = velocity;
            owner.rotation_radians = velocity.y.atan2(velocity.x);
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::test_support::{Harness, DT};

    fn archer(harness: &mut Harness, target: EntityId, spec: ProjectileSpec) -> EntityId {
        let mut archer = Entity::new("archer", Vec2::new(0.0, 0.0), (16, 16))
            .with_behavior(Shoot::new(target, DT * 2.0, 120.0, spec).expect("shoot"));
        archer.flags.enemy = true;
        harness.spawn(archer)
    }

    fn projectiles(harness: &Harness) -> Vec<&Entity> {
        harness
            .world
            .entities()
            .iter()
            .filter(|entity| entity.has_behavior(BehaviorKind::Projectile))
            .collect()
    }

    #[test]
    fn shoots_on_interval_when_target_in_range() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 80.0, 0.0);
        let archer = archer(&mut harness, player, ProjectileSpec::default());

        harness.run(archer);
        harness.world.apply_pending();
        assert!(projectiles(&harness).is_empty());

        harness.run(archer);
        harness.world.apply_pending();
        let fired = projectiles(&harness);
        assert_eq!(fired.len(), 1);
        assert!(fired[0].flags.can_hurt_player);
        assert!(!fired[0].flags.can_hurt_enemies);
        assert_eq!(fired[0].center(), Vec2::new(8.0, 8.0));
    }

    #[test]
    fn holds_fire_out_of_range() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 300.0, 0.0);
        let archer = archer(&mut harness, player, ProjectileSpec::default());
        for _ in 0..5 {
            harness.run(archer);
        }
        harness.world.apply_pending();
        assert!(projectiles(&harness).is_empty());
    }

    #[test]
    fn projectile_flies_straight_then_expires() {
        let mut harness = Harness::new();
        let arrow = harness.spawn(
            Entity::new("arrow", Vec2::ZERO, (4, 4))
                .with_behavior(Projectile::new(Vec2::new(1.0, 0.0), 60.0, DT * 3.5)),
        );

        harness.run(arrow);
        let entity = harness.world.get(arrow).expect("arrow");
        assert!((entity.velocity.x - 1.0).abs() < 0.0001);
        assert_eq!(entity.friction, 1.0);

        for _ in 0..3 {
            harness.run(arrow);
        }
        assert!(harness.world.get(arrow).is_none());
    }

    #[test]
    fn projectile_stops_on_wall_contact() {
        let mut harness = Harness::new();
        let mut arrow = Entity::new("arrow", Vec2::ZERO, (4, 4))
            .with_behavior(Projectile::new(Vec2::new(1.0, 0.0), 60.0, 5.0));
        arrow.flags.colliding = true;
        let arrow = harness.spawn(arrow);
        harness.run(arrow);
        assert!(harness.world.get(arrow).is_none());
    }

    #[test]
    fn homing_projectile_turns_toward_target() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 0.0, 100.0);
        let arrow_id = harness.spawn_at("arrow", 0.0, 0.0);
        let mut flight =
            Projectile::new(Vec2::new(1.0, 0.0), 60.0, 5.0).with_homing(player, 6.0);

        harness.step(arrow_id, &mut flight);
        assert!(flight.direction().y > 0.0);
        assert!((flight.direction().length() - 1.0).abs() < 0.0001);
    }
}
