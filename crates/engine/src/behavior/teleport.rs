use crate::entity::EntityId;
use crate::events::{keys, EventPayload, TeleportTarget};

use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

pub const DEFAULT_TELEPORT_DELAY_SECONDS: f32 = 0.1;

/// When `target` steps onto the owner, schedules a teleport event for the
/// configured destination. Re-arms once the target steps off.
#[derive(Debug, Clone)]
pub struct Teleport {
    target: EntityId,
    destination: TeleportTarget,
    delay_seconds: f32,
    armed: bool,
}

impl Teleport {
    pub fn new(target: EntityId, destination: TeleportTarget) -> Self {
        Self {
            target,
            destination,
            delay_seconds: DEFAULT_TELEPORT_DELAY_SECONDS,
            armed: true,
        }
    }

    pub fn with_delay(mut self, delay_seconds: f32) -> Self {
        self.delay_seconds = delay_seconds;
        self
    }
}

impl Behavior for Teleport {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Teleport
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        let overlapping = ctx.hurtboxes_overlap(self.target);
        if overlapping && self.armed {
            self.armed = false;
            ctx.events.schedule_delayed(
                keys::TELEPORT,
                self.delay_seconds,
                EventPayload::Teleport(self.destination.clone()),
                None,
            );
        } else if !overlapping {
            self.armed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::test_support::{Harness, DT};
    use crate::entity::Entity;
    use crate::geometry::Vec2;

    fn stairs(harness: &mut Harness, target: EntityId) -> EntityId {
        let destination = TeleportTarget {
            map: "cellar".to_string(),
            position: Vec2::new(32.0, 48.0),
        };
        harness.spawn(
            Entity::new("stairs", Vec2::new(0.0, 0.0), (16, 16))
                .with_behavior(Teleport::new(target, destination)),
        )
    }

    #[test]
    fn overlap_schedules_one_delayed_teleport() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 4.0, 4.0);
        let stairs = stairs(&mut harness, player);

        harness.run(stairs);
        harness.run(stairs);
        assert_eq!(harness.events.pending_delayed(), 1);
        assert!(!harness.events.has(keys::TELEPORT));

        harness.events.tick(DEFAULT_TELEPORT_DELAY_SECONDS + DT);
        let target = harness
            .events
            .latest(keys::TELEPORT)
            .and_then(EventPayload::as_teleport)
            .expect("teleport payload");
        assert_eq!(target.map, "cellar");
        assert_eq!(target.position, Vec2::new(32.0, 48.0));
    }

    #[test]
    fn no_overlap_no_teleport() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 64.0, 64.0);
        let stairs = stairs(&mut harness, player);
        harness.run(stairs);
        assert_eq!(harness.events.pending_delayed(), 0);
    }

    #[test]
    fn stepping_off_rearms() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 4.0, 4.0);
        let stairs = stairs(&mut harness, player);
        harness.run(stairs);

        let move_player = |harness: &mut Harness, x: f32| {
            harness
                .world
                .get_mut(player)
                .expect("player")
                .set_position(Vec2::new(x, 4.0));
        };
        move_player(&mut harness, 64.0);
        harness.run(stairs);
        move_player(&mut harness, 4.0);
        harness.run(stairs);
        assert_eq!(harness.events.pending_delayed(), 2);
    }
}
