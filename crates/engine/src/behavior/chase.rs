use crate::entity::EntityId;
use crate::geometry::Direction;

use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

/// Steers toward `target` once it comes within `aggro_distance`, gives up past
/// `deaggro_distance` and stops pushing inside `min_distance`.
#[derive(Debug, Clone)]
pub struct Chase {
    target: EntityId,
    aggro_distance: f32,
    deaggro_distance: f32,
    min_distance: f32,
    chasing: bool,
}

impl Chase {
    pub fn new(
        target: EntityId,
        aggro_distance: f32,
        deaggro_distance: f32,
        min_distance: f32,
    ) -> Result<Self, BehaviorError> {
        if deaggro_distance < aggro_distance {
            return Err(BehaviorError::InvalidParameter {
                behavior: BehaviorKind::Chase,
                parameter: "deaggro_distance",
                value: deaggro_distance,
            });
        }
        if min_distance < 0.0 {
            return Err(BehaviorError::InvalidParameter {
                behavior: BehaviorKind::Chase,
                parameter: "min_distance",
                value: min_distance,
            });
        }
        Ok(Self {
            target,
            aggro_distance,
            deaggro_distance,
            min_distance,
            chasing: false,
        })
    }

    pub fn is_chasing(&self) -> bool {
        self.chasing
    }
}

impl Behavior for Chase {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Chase
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        let Some(target_center) = ctx.entity(self.target).map(|target| target.center()) else {
            self.chasing = false;
            return Ok(());
        };
        let Some(owner) = ctx.owner_mut() else {
            return Ok(());
        };

        let offset = target_center - owner.center();
        let distance = offset.length();
        if !self.chasing && distance <= self.aggro_distance {
            self.chasing = true;
        } else if self.chasing && distance > self.deaggro_distance {
            self.chasing = false;
        }

        if self.chasing && distance > self.min_distance {
            owner.acceleration += offset.normalized();
            if let Some(direction) = Direction::from_vector(offset) {
                owner.facing = direction;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::test_support::Harness;
    use crate::entity::Entity;
    use crate::geometry::Vec2;

    fn chaser(harness: &mut Harness, target: EntityId, x: f32) -> EntityId {
        let chase = Chase::new(target, 64.0, 96.0, 12.0).expect("chase");
        harness.spawn(Entity::new("wolf", Vec2::new(x, 0.0), (16, 16)).with_behavior(chase))
    }

    #[test]
    fn rejects_deaggro_inside_aggro() {
        let error = Chase::new(EntityId(0), 64.0, 32.0, 0.0).expect_err("invalid");
        assert!(matches!(
            error,
            BehaviorError::InvalidParameter {
                parameter: "deaggro_distance",
                ..
            }
        ));
    }

    #[test]
    fn accelerates_toward_target_inside_aggro_range() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 0.0, 0.0);
        let wolf = chaser(&mut harness, player, 50.0);

        harness.run(wolf);
        let wolf = harness.world.get(wolf).expect("wolf");
        assert!(wolf.acceleration.x < 0.0);
        assert_eq!(wolf.facing, Direction::Left);
    }

    #[test]
    fn ignores_target_outside_aggro_range() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 0.0, 0.0);
        let wolf = chaser(&mut harness, player, 80.0);

        harness.run(wolf);
        assert_eq!(harness.world.get(wolf).expect("wolf").acceleration, Vec2::ZERO);
    }

    #[test]
    fn keeps_chasing_until_deaggro_then_stops() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 0.0, 0.0);
        let wolf = chaser(&mut harness, player, 50.0);
        harness.run(wolf);

        let move_wolf = |harness: &mut Harness, x: f32| {
            let entity = harness.world.get_mut(wolf).expect("wolf");
            entity.acceleration = Vec2::ZERO;
            entity.set_position(Vec2::new(x, 0.0));
        };

        move_wolf(&mut harness, 90.0);
        harness.run(wolf);
        assert!(harness.world.get(wolf).expect("wolf").acceleration.x < 0.0);

        move_wolf(&mut harness, 120.0);
        harness.run(wolf);
        assert_eq!(harness.world.get(wolf).expect("wolf").acceleration, Vec2::ZERO);
    }

    #[test]
    fn halts_at_min_distance() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 0.0, 0.0);
        let wolf = chaser(&mut harness, player, 8.0);

        harness.run(wolf);
        assert_eq!(harness.world.get(wolf).expect("wolf").acceleration, Vec2::ZERO);
    }
}
