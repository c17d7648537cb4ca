use crate::entity::EntityId;
use crate::events::{keys, EventPayload};
use crate::geometry::Vec2;

use super::interact::publish_opened;
use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

pub const DEFAULT_FLOAT_SECONDS: f32 = 0.6;

/// Restores `amount` health to `target` on touch and consumes the owner.
#[derive(Debug, Clone)]
pub struct Heal {
    target: EntityId,
    object_id: Option<u32>,
    amount: i32,
    done: bool,
}

impl Heal {
    pub fn new(target: EntityId, amount: i32) -> Self {
        Self {
            target,
            object_id: None,
            amount,
            done: false,
        }
    }

    pub fn with_object_id(mut self, object_id: u32) -> Self {
        self.object_id = Some(object_id);
        self
    }
}

impl Behavior for Heal {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Heal
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        if !ctx.hurtboxes_overlap(self.target) {
            return Ok(());
        }
        let Some(target) = ctx.entity_mut(self.target) else {
            return Ok(());
        };
        target.health = (target.health + self.amount).min(target.max_health);

        ctx.events
            .publish(keys::HEALED, EventPayload::Number(self.amount as f32));
        ctx.events
            .publish(keys::PLAY_SOUND, EventPayload::Text("heal".to_string()));
        publish_opened(ctx, self.object_id);
        ctx.despawn_owner();
        self.done = true;
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CollectPhase {
    Waiting,
    Floating { remaining_seconds: f32 },
    Collected,
}

/// Adds an item to the inventory on touch, then floats above the collector
/// for a moment before disappearing. The object counts as opened from the
/// moment of the touch.
#[derive(Debug, Clone)]
pub struct CollectItem {
    target: EntityId,
    object_id: Option<u32>,
    item: String,
    amount: i32,
    float_seconds: f32,
    phase: CollectPhase,
}

impl CollectItem {
    pub fn new(target: EntityId, item: impl Into<String>, amount: i32) -> Self {
        Self {
            target,
            object_id: None,
            item: item.into(),
            amount,
            float_seconds: DEFAULT_FLOAT_SECONDS,
            phase: CollectPhase::Waiting,
        }
    }

    pub fn with_object_id(mut self, object_id: u32) -> Self {
        self.object_id = Some(object_id);
        self
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.phase, CollectPhase::Floating { .. })
    }
}

impl Behavior for CollectItem {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::CollectItem
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        match self.phase {
            CollectPhase::Waiting => {
                if !ctx.hurtboxes_overlap(self.target) {
                    return Ok(());
                }
                ctx.inventory.add(&self.item, self.amount);
                ctx.events.publish(
                    keys::ITEM_DELTA,
                    EventPayload::Item {
                        key: self.item.clone(),
                        amount: self.amount,
                    },
                );
                ctx.events
                    .publish(keys::PLAY_SOUND, EventPayload::Text("pickup".to_string()));
                publish_opened(ctx, self.object_id);
                self.phase = CollectPhase::Floating {
                    remaining_seconds: self.float_seconds,
                };
            }
            CollectPhase::Floating { remaining_seconds } => {
                let remaining_seconds = remaining_seconds - ctx.dt_seconds;
                let anchor = ctx
                    .entity(self.target)
                    .map(|target| (target.center(), target.rect().h));
                match anchor {
                    Some((center, height)) if remaining_seconds > 0.0 => {
                        if let Some(owner) = ctx.owner_mut() {
                            let lift = (height + owner.rect().h) as f32 * 0.5;
                            owner.set_center(center - Vec2::new(0.0, lift));
                        }
                        self.phase = CollectPhase::Floating { remaining_seconds };
                    }
                    _ => {
                        ctx.despawn_owner();
                        self.phase = CollectPhase::Collected;
                    }
                }
            }
            CollectPhase::Collected => {}
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.phase == CollectPhase::Collected
    }
}
