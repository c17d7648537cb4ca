use crate::entity::EntityId;
use crate::geometry::Direction;

use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

/// Turns the owner toward the horizontal side `target` stands on.
#[derive(Debug, Clone)]
pub struct Watch {
    target: EntityId,
}

impl Watch {
    pub fn new(target: EntityId) -> Self {
        Self { target }
    }
}

impl Behavior for Watch {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Watch
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        let Some(target_x) = ctx.entity(self.target).map(|target| target.center().x) else {
            return Ok(());
        };
        if let Some(owner) = ctx.owner_mut() {
            let own_x = owner.center().x;
            if target_x < own_x {
                owner.facing = Direction::Left;
            } else if target_x > own_x {
                owner.facing = Direction::Right;
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

    #[test]
    fn faces_the_target_side() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 10.0, 50.0);
        let npc = harness.spawn(
            Entity::new("npc", Vec2::new(100.0, 50.0), (16, 16)).with_behavior(Watch::new(player)),
        );

        harness.run(npc);
        assert_eq!(harness.world.get(npc).expect("npc").facing, Direction::Left);

        harness
            .world
            .get_mut(player)
            .expect("player")
            .set_position(Vec2::new(200.0, 0.0));
        harness.run(npc);
        assert_eq!(harness.world.get(npc).expect("npc").facing, Direction::Right);
    }

    #[test]
    fn missing_target_leaves_facing_alone() {
        let mut harness = Harness::new();
        let npc = harness.spawn(
            Entity::new("npc", Vec2::ZERO, (16, 16)).with_behavior(Watch::new(EntityId(77))),
        );
        harness.run(npc);
        assert_eq!(harness.world.get(npc).expect("npc").facing, Direction::Down);
    }
}
