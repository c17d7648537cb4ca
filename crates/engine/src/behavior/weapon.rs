use std::f32::consts::{FRAC_PI_2, PI};

use crate::entity::EntityId;
use crate::events::{keys, EventPayload};
use crate::geometry::{Direction, Vec2};

use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

/// Drives a short-lived weapon entity: keeps it at `reach` from the wielder's
/// center, sweeps it across `sweep_radians` around the wielder's facing and
/// removes it once `lifetime_seconds` have elapsed.
#[derive(Debug, Clone)]
pub struct Weapon {
    wielder: EntityId,
    lifetime_seconds: f32,
    elapsed_seconds: f32,
    sweep_radians: f32,
    reach: f32,
    done: bool,
}

impl Weapon {
    pub fn new(
        wielder: EntityId,
        lifetime_seconds: f32,
        sweep_radians: f32,
        reach: f32,
    ) -> Result<Self, BehaviorError> {
        if lifetime_seconds <= 0.0 {
            return Err(BehaviorError::InvalidParameter {
                behavior: BehaviorKind::Weapon,
                parameter: "lifetime_seconds",
                value: lifetime_seconds,
            });
        }
        Ok(Self {
            wielder,
            lifetime_seconds,
            elapsed_seconds: 0.0,
            sweep_radians,
            reach,
            done: false,
        })
    }

    pub fn wielder(&self) -> EntityId {
        self.wielder
    }

    fn finish(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.done = true;
        ctx.despawn_owner();
        ctx.events
            .publish(keys::WEAPON_FINISHED, EventPayload::Entity(self.wielder));
    }
}

fn facing_angle(direction: Direction) -> f32 {
    match direction {
        Direction::Right => 0.0,
        Direction::Down => FRAC_PI_2,
        Direction::Left => PI,
        Direction::Up => -FRAC_PI_2,
    }
}

impl Behavior for Weapon {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Weapon
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        self.elapsed_seconds += ctx.dt_seconds;
        let Some((center, facing)) = ctx
            .entity(self.wielder)
            .map(|wielder| (wielder.center(), wielder.facing))
        else {
            self.finish(ctx);
            return Ok(());
        };

        let progress = (self.elapsed_seconds / self.lifetime_seconds).min(1.0);
        let angle = facing_angle(facing) - self.sweep_radians * 0.5 + self.sweep_radians * progress;
        let reach = self.reach;
        if let Some(owner) = ctx.owner_mut() {
            owner.facing = facing;
            owner.rotation_radians = angle;
            owner.set_center(center + Vec2::new(angle.cos(), angle.sin()) * reach);
        }

        if self.elapsed_seconds >= self.lifetime_seconds {
            self.finish(ctx);
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
    use crate::behavior::test_support::Harness;
    use crate::entity::Entity;

    fn sword(harness: &mut Harness, wielder: EntityId) -> EntityId {
        let weapon = Weapon::new(wielder, 0.1, FRAC_PI_2, 12.0).expect("weapon");
        harness.spawn(Entity::new("sword", Vec2::ZERO, (8, 8)).with_behavior(weapon))
    }

    #[test]
    fn follows_wielder_and_sweeps_around_facing() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 92.0, 92.0);
        harness.world.get_mut(player).expect("player").facing = Direction::Right;
        let sword = sword(&mut harness, player);

        harness.run(sword);
        let first = harness.world.get(sword).expect("sword").rotation_radians;
        harness.run(sword);
        let second = harness.world.get(sword).expect("sword").rotation_radians;

        assert!(first < second);
        assert!(first > -FRAC_PI_2 * 0.5 - 0.0001);
        let center = harness.world.get(sword).expect("sword").center();
        assert!(center.x > 100.0);
    }

    #[test]
    fn lifetime_elapsing_removes_weapon_and_publishes_finish() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 92.0, 92.0);
        let sword = sword(&mut harness, player);

        for _ in 0..7 {
            harness.run(sword);
        }

        assert!(harness.world.get(sword).is_none());
        assert_eq!(
            harness.events.latest(keys::WEAPON_FINISHED),
            Some(&EventPayload::Entity(player))
        );
        harness.world.apply_pending();
        assert_eq!(harness.world.entity_count(), 1);
    }

    #[test]
    fn missing_wielder_ends_the_swing() {
        let mut harness = Harness::new();
        let sword = sword(&mut harness, EntityId(500));
        harness.run(sword);
        assert!(harness.world.get(sword).is_none());
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        assert!(Weapon::new(EntityId(0), 0.0, 1.0, 4.0).is_err());
    }
}
