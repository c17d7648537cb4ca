use crate::entity::EntityId;
use crate::events::{keys, EventPayload};

use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

/// One-shot area trigger: publishes its event the first time `target` touches
/// it, then removes itself.
#[derive(Debug, Clone)]
pub struct Trigger {
    target: EntityId,
    event: String,
    payload: EventPayload,
    object_id: Option<u32>,
    fired: bool,
}

impl Trigger {
    pub fn new(target: EntityId, event: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            target,
            event: event.into(),
            payload,
            object_id: None,
            fired: false,
        }
    }

    pub fn with_object_id(mut self, object_id: u32) -> Self {
        self.object_id = Some(object_id);
        self
    }
}

impl Behavior for Trigger {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Trigger
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        if self.fired || !ctx.hurtboxes_overlap(self.target) {
            return Ok(());
        }
        self.fired = true;
        if let Some(object_id) = self.object_id {
            ctx.events
                .publish(&keys::object_opened(object_id), EventPayload::None);
        }
        ctx.events.publish(&self.event, self.payload.clone());
        ctx.despawn_owner();
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::behavior::test_support::Harness;
    use crate::entity::Entity;
    use crate::geometry::Vec2;

    #[test]
    fn fires_once_on_contact() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 100.0, 0.0);
        let trigger = Trigger::new(
            player,
            keys::START_CUTSCENE,
            EventPayload::Text("intro".to_string()),
        )
        .with_object_id(12);
        let plate = harness.spawn(Entity::new("plate", Vec2::ZERO, (16, 16)).with_behavior(trigger));

        let fired = Rc::new(Cell::new(0));
        let fired_in_listener = Rc::clone(&fired);
        harness.events.subscribe(keys::START_CUTSCENE, move |_, _| {
            fired_in_listener.set(fired_in_listener.get() + 1);
        });

        harness.run(plate);
        assert_eq!(fired.get(), 0);

        harness
            .world
            .get_mut(player)
            .expect("player")
            .set_position(Vec2::new(4.0, 4.0));
        harness.run(plate);
        harness.run(plate);

        assert_eq!(fired.get(), 1);
        assert!(harness.events.has(&keys::object_opened(12)));
        assert!(harness.world.get(plate).is_none());
    }
}
