//! Per-entity units of logic.
//!
//! An [`Entity`] owns its behaviors, but behaviors only ever hold [`EntityId`]
//! handles to the entities they affect. Every handle is re-resolved through
//! the [`EntityWorld`] on each tick; a handle that no longer resolves turns the
//! update into a silent no-op.

use std::fmt;

use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::warn;

use crate::app::{Camera2D, InputAction, InputSnapshot, Renderer};
use crate::entity::{Entity, EntityId};
use crate::events::EventBus;
use crate::geometry::Rect;
use crate::inventory::Inventory;
use crate::world::EntityWorld;

mod chase;
mod death;
mod emitter;
mod interact;
mod pickup;
mod projectile;
mod random_walk;
mod teleport;
mod trigger;
mod watch;
mod weapon;

pub use chase::Chase;
pub use death::Death;
pub use emitter::{Emitter, Particle};
pub use interact::{Chest, Dialogue, OpenLock, TradeItem};
pub use pickup::{CollectItem, Heal};
pub use projectile::{Projectile, ProjectileSpec, Shoot};
pub use random_walk::RandomWalk;
pub use teleport::Teleport;
pub use trigger::Trigger;
pub use watch::Watch;
pub use weapon::Weapon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorKind {
    Watch,
    RandomWalk,
    Chase,
    Weapon,
    Death,
    Teleport,
    Heal,
    CollectItem,
    Dialogue,
    TradeItem,
    Chest,
    OpenLock,
    Trigger,
    Shoot,
    Projectile,
    Emitter,
}

impl BehaviorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Watch => "watch",
            Self::RandomWalk => "random_walk",
            Self::Chase => "chase",
            Self::Weapon => "weapon",
            Self::Death => "death",
            Self::Teleport => "teleport",
            Self::Heal => "heal",
            Self::CollectItem => "collect_item",
            Self::Dialogue => "dialogue",
            Self::TradeItem => "trade_item",
            Self::Chest => "chest",
            Self::OpenLock => "open_lock",
            Self::Trigger => "trigger",
            Self::Shoot => "shoot",
            Self::Projectile => "projectile",
            Self::Emitter => "emitter",
        }
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BehaviorError {
    #[error("{behavior}: parameter `{parameter}` is invalid ({value})")]
    InvalidParameter {
        behavior: BehaviorKind,
        parameter: &'static str,
        value: f32,
    },
    #[error("{behavior}: no content to show")]
    EmptyContent { behavior: BehaviorKind },
}

/// Interaction gate shared by every talkable/openable object in a scene.
/// Owned by the gameplay scene and reset on teardown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionState {
    pub textbox_open: bool,
    cooldown_remaining: f32,
    cooldown_seconds: f32,
    range: f32,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self::new(0.25, 24.0)
    }
}

impl InteractionState {
    pub fn new(cooldown_seconds: f32, range: f32) -> Self {
        Self {
            textbox_open: false,
            cooldown_remaining: 0.0,
            cooldown_seconds,
            range,
        }
    }

    pub fn tick(&mut self, dt_seconds: f32) {
        self.cooldown_remaining = (self.cooldown_remaining - dt_seconds).max(0.0);
    }

    pub fn ready(&self) -> bool {
        !self.textbox_open && self.cooldown_remaining <= 0.0
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    pub fn open_textbox(&mut self) {
        self.textbox_open = true;
    }

    pub fn close_textbox(&mut self) {
        self.textbox_open = false;
        self.start_cooldown();
    }

    pub fn start_cooldown(&mut self) {
        self.cooldown_remaining = self.cooldown_seconds;
    }

    pub fn reset(&mut self) {
        self.textbox_open = false;
        self.cooldown_remaining = 0.0;
    }
}

/// Everything a behavior may touch during one update.
pub struct BehaviorContext<'a> {
    pub owner: EntityId,
    pub dt_seconds: f32,
    pub world: &'a mut EntityWorld,
    pub events: &'a mut EventBus,
    pub input: &'a InputSnapshot,
    pub inventory: &'a mut Inventory,
    pub interaction: &'a mut InteractionState,
    pub rng: &'a mut ChaCha8Rng,
    pub obstacles: &'a [Rect],
    pub room_bounds: Rect,
    pub tile_size: i32,
}

impl BehaviorContext<'_> {
    pub fn owner(&self) -> Option<&Entity> {
        self.world.get(self.owner)
    }

    pub fn owner_mut(&mut self) -> Option<&mut Entity> {
        self.world.get_mut(self.owner)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.world.get_mut(id)
    }

    /// Owner and `other`, both mutable.
    pub fn owner_and_mut(&mut self, other: EntityId) -> Option<(&mut Entity, &mut Entity)> {
        self.world.get_pair_mut(self.owner, other)
    }

    pub fn hurtboxes_overlap(&self, other: EntityId) -> bool {
        match (self.owner(), self.entity(other)) {
            (Some(owner), Some(other)) => owner.hurtbox().intersects(&other.hurtbox()),
            _ => false,
        }
    }

    pub fn within_interaction_range(&self, other: EntityId) -> bool {
        match (self.owner(), self.entity(other)) {
            (Some(owner), Some(other)) => {
                owner.center().distance(other.center()) <= self.interaction.range()
            }
            _ => false,
        }
    }

    /// Confirm pressed this frame, nothing else holds the textbox, and
    /// `actor` stands close enough to the owner.
    pub fn interaction_requested(&self, actor: EntityId) -> bool {
        self.interaction.ready()
            && self.input.just_pressed(InputAction::Confirm)
            && self.within_interaction_range(actor)
    }

    pub fn despawn_owner(&mut self) {
        self.world.despawn(self.owner);
    }
}

pub trait Behavior: fmt::Debug {
    fn kind(&self) -> BehaviorKind;

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError>;

    fn draw(&self, _renderer: &mut dyn Renderer, _camera: &Camera2D) {}

    fn is_done(&self) -> bool {
        false
    }
}

/// Runs the owner's behaviors in attachment order. A failing behavior is
/// logged and skipped; the remaining ones still run. Behaviors attached while
/// the list executes are appended after it.
pub fn execute_behaviors(ctx: &mut BehaviorContext<'_>) {
    let Some(owner) = ctx.world.get_mut(ctx.owner) else {
        return;
    };
    let mut behaviors = std::mem::take(&mut owner.behaviors);

    for behavior in behaviors.iter_mut() {
        if behavior.is_done() {
            continue;
        }
        if let Err(error) = behavior.update(ctx) {
            warn!(
                entity = ctx.owner.0,
                behavior = behavior.kind().name(),
                error = %error,
                "behavior_failed"
            );
        }
    }

    if let Some(owner) = ctx.world.get_including_marked_mut(ctx.owner) {
        let attached_during_update = std::mem::replace(&mut owner.behaviors, behaviors);
        owner.behaviors.extend(attached_during_update);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use rand::SeedableRng;

    use super::*;
    use crate::geometry::Vec2;

    pub(crate) const DT: f32 = 1.0 / 60.0;

    pub(crate) struct Harness {
        pub world: EntityWorld,
        pub events: EventBus,
        pub input: InputSnapshot,
        pub inventory: Inventory,
        pub interaction: InteractionState,
        pub rng: ChaCha8Rng,
        pub obstacles: Vec<Rect>,
        pub room_bounds: Rect,
    }

    impl Harness {
        pub(crate) fn new() -> Self {
            Self {
                world: EntityWorld::default(),
                events: EventBus::new(),
                input: InputSnapshot::empty(),
                inventory: Inventory::new(),
                interaction: InteractionState::default(),
                rng: ChaCha8Rng::seed_from_u64(7),
                obstacles: Vec::new(),
                room_bounds: Rect::new(0, 0, 320, 256),
            }
        }

        pub(crate) fn spawn(&mut self, entity: Entity) -> EntityId {
            let id = self.world.spawn(entity);
            self.world.apply_pending();
            id
        }

        pub(crate) fn spawn_at(&mut self, name: &str, x: f32, y: f32) -> EntityId {
            self.spawn(Entity::new(name, Vec2::new(x, y), (16, 16)))
        }

        pub(crate) fn with_context<R>(
            &mut self,
            owner: EntityId,
            f: impl FnOnce(&mut BehaviorContext<'_>) -> R,
        ) -> R {
            let mut ctx = BehaviorContext {
                owner,
                dt_seconds: DT,
                world: &mut self.world,
                events: &mut self.events,
                input: &self.input,
                inventory: &mut self.inventory,
                interaction: &mut self.interaction,
                rng: &mut self.rng,
                obstacles: &self.obstacles,
                room_bounds: self.room_bounds,
                tile_size: 16,
            };
            f(&mut ctx)
        }

        pub(crate) fn run(&mut self, owner: EntityId) {
            self.with_context(owner, execute_behaviors);
        }

        /// Updates a detached behavior as if `owner` carried it.
        pub(crate) fn step(&mut self, owner: EntityId, behavior: &mut dyn Behavior) {
            self.with_context(owner, |ctx| behavior.update(ctx))
                .expect("behavior update");
        }

        pub(crate) fn press_confirm(&mut self) {
            self.input = InputSnapshot::empty().with_action_pressed(InputAction::Confirm);
        }

        pub(crate) fn release_all(&mut self) {
            self.input = InputSnapshot::empty();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[derive(Debug)]
    struct Failing;

    impl Behavior for Failing {
        fn kind(&self) -> BehaviorKind {
            BehaviorKind::Trigger
        }

        fn update(&mut self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
            Err(BehaviorError::EmptyContent {
                behavior: BehaviorKind::Trigger,
            })
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        ticks: u32,
    }

    impl Behavior for Counter {
        fn kind(&self) -> BehaviorKind {
            BehaviorKind::Watch
        }

        fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
            self.ticks += 1;
            if let Some(owner) = ctx.owner_mut() {
                owner.health = self.ticks as i32;
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Grafter;

    impl Behavior for Grafter {
        fn kind(&self) -> BehaviorKind {
            BehaviorKind::Emitter
        }

        fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
            if let Some(owner) = ctx.owner_mut() {
                owner.attach(Box::new(Counter::default()));
            }
            Ok(())
        }
    }

    #[test]
    fn failing_behavior_does_not_stop_the_rest() {
        let mut harness = Harness::new();
        let entity = Entity::new("bat", crate::geometry::Vec2::ZERO, (8, 8))
            .with_behavior(Failing)
            .with_behavior(Counter::default());
        let id = harness.spawn(entity);

        harness.run(id);
        harness.run(id);

        let bat = harness.world.get(id).expect("bat");
        assert_eq!(bat.health, 2);
        assert_eq!(bat.behaviors.len(), 2);
    }

    #[test]
    fn behaviors_attached_during_update_are_appended() {
        let mut harness = Harness::new();
        let entity = Entity::new("spawner", crate::geometry::Vec2::ZERO, (8, 8))
            .with_behavior(Grafter);
        let id = harness.spawn(entity);

        harness.run(id);
        let spawner = harness.world.get(id).expect("spawner");
        assert_eq!(spawner.behaviors.len(), 2);
        assert_eq!(spawner.behaviors[0].kind(), BehaviorKind::Emitter);
        assert_eq!(spawner.behaviors[1].kind(), BehaviorKind::Watch);
    }

    #[test]
    fn missing_owner_is_a_no_op() {
        let mut harness = Harness::new();
        harness.run(EntityId(404));
        assert_eq!(harness.world.entity_count(), 0);
    }

    #[test]
    fn interaction_state_blocks_while_textbox_open_and_during_cooldown() {
        let mut state = InteractionState::new(0.5, 24.0);
        assert!(state.ready());
        state.open_textbox();
        assert!(!state.ready());
        state.close_textbox();
        assert!(!state.ready());
        state.tick(0.25);
        assert!(!state.ready());
        state.tick(0.25);
        assert!(state.ready());
    }
}
