use crate::behavior::{Behavior, BehaviorKind};
use crate::geometry::{Direction, Rect, Vec2};

pub const DEFAULT_FRICTION: f32 = 0.8;
/// Velocities with a squared magnitude below this snap to zero.
pub const VELOCITY_SNAP_SQUARED: f32 = 0.01;
pub const ANIMATION_FRAME_SECONDS: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    pub const UNASSIGNED: EntityId = EntityId(u64::MAX);
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityFlags {
    pub persistent: bool,
    pub enemy: bool,
    pub can_hurt_player: bool,
    pub can_hurt_enemies: bool,
    pub static_collision: bool,
    pub visible: bool,
    pub colliding: bool,
}

impl Default for EntityFlags {
    fn default() -> Self {
        Self {
            persistent: false,
            enemy: false,
            can_hurt_player: false,
            can_hurt_enemies: false,
            static_collision: false,
            visible: true,
            colliding: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisualEffect {
    /// Shrink-and-fade; `progress` runs from 0 to 1.
    Dissolve { progress: f32 },
    Flash { remaining_seconds: f32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnimationKind {
    #[default]
    Idle,
    Walk,
    Hurt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationState {
    pub kind: AnimationKind,
    pub frame: usize,
    timer_seconds: f32,
}

impl AnimationState {
    pub fn advance(&mut self, kind: AnimationKind, dt_seconds: f32, frame_count: usize) {
        if kind != self.kind {
            self.kind = kind;
            self.frame = 0;
            self.timer_seconds = 0.0;
        }
        let frame_count = frame_count.max(1);
        self.timer_seconds += dt_seconds;
        while self.timer_seconds >= ANIMATION_FRAME_SECONDS {
            self.timer_seconds -= ANIMATION_FRAME_SECONDS;
            self.frame = (self.frame + 1) % frame_count;
        }
    }
}

/// A simulated game object. The collision rect and hurtbox are derived from
/// the sub-pixel `position`; every position change re-syncs both.
#[derive(Debug)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub object_id: Option<u32>,
    rect: Rect,
    hurtbox: Rect,
    hurtbox_offset: (i32, i32),
    position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub health: i32,
    pub max_health: i32,
    pub speed: f32,
    pub friction: f32,
    pub knockback: f32,
    pub damage: i32,
    pub facing: Direction,
    pub draw_layer: i32,
    pub flags: EntityFlags,
    pub effect: Option<VisualEffect>,
    pub rotation_radians: f32,
    pub texture: String,
    pub animation: AnimationState,
    pub iframe_timer: f32,
    pub behaviors: Vec<Box<dyn Behavior>>,
    marked_for_deletion: bool,
}

impl Entity {
    pub fn new(name: impl Into<String>, position: Vec2, size: (i32, i32)) -> Self {
        let (w, h) = size;
        let mut entity = Self {
            id: EntityId::UNASSIGNED,
            name: name.into(),
            object_id: None,
            rect: Rect::new(0, 0, w, h),
            hurtbox: Rect::new(0, 0, w, h),
            hurtbox_offset: (0, 0),
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            health: 1,
            max_health: 1,
            speed: 0.0,
            friction: DEFAULT_FRICTION,
            knockback: 0.0,
            damage: 0,
            facing: Direction::Down,
            draw_layer: 0,
            flags: EntityFlags::default(),
            effect: None,
            rotation_radians: 0.0,
            texture: String::new(),
            animation: AnimationState::default(),
            iframe_timer: 0.0,
            behaviors: Vec::new(),
            marked_for_deletion: false,
        };
        entity.sync_boxes();
        entity
    }

    pub fn with_hurtbox(mut self, w: i32, h: i32, offset_x: i32, offset_y: i32) -> Self {
        self.hurtbox.w = w;
        self.hurtbox.h = h;
        self.hurtbox_offset = (offset_x, offset_y);
        self.sync_boxes();
        self
    }

    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behaviors.push(Box::new(behavior));
        self
    }

    pub fn attach(&mut self, behavior: Box<dyn Behavior>) {
        self.behaviors.push(behavior);
    }

    pub fn has_behavior(&self, kind: BehaviorKind) -> bool {
        self.behaviors.iter().any(|behavior| behavior.kind() == kind)
    }

    pub fn behavior_finished(&self, kind: BehaviorKind) -> bool {
        self.behaviors
            .iter()
            .any(|behavior| behavior.kind() == kind && behavior.is_done())
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.sync_boxes();
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.set_position(self.position + delta);
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.set_position(Vec2 {
            x: center.x - self.rect.w as f32 * 0.5,
            y: center.y - self.rect.h as f32 * 0.5,
        });
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn hurtbox(&self) -> Rect {
        self.hurtbox
    }

    pub fn center(&self) -> Vec2 {
        self.rect.center()
    }

    fn sync_boxes(&mut self) {
        self.rect.x = self.position.x.floor() as i32;
        self.rect.y = self.position.y.floor() as i32;
        self.hurtbox.x = self.rect.x + (self.rect.w - self.hurtbox.w) / 2 + self.hurtbox_offset.0;
        self.hurtbox.y = self.rect.y + (self.rect.h - self.hurtbox.h) / 2 + self.hurtbox_offset.1;
    }

    /// Integrates one physics step: acceleration (clamped to unit length) into
    /// velocity, friction, anti-jitter snap, velocity into position.
    pub fn update(&mut self, dt_seconds: f32) {
        let mut acceleration = self.acceleration;
        if acceleration.length_squared() > 1.0 {
            acceleration = acceleration.normalized();
        }
        self.velocity += acceleration * self.speed * dt_seconds;
        self.velocity *= self.friction;
        if self.velocity.length_squared() < VELOCITY_SNAP_SQUARED {
            self.velocity = Vec2::ZERO;
        }
        if !self.velocity.is_zero() {
            self.translate(self.velocity);
        }
        self.acceleration = Vec2::ZERO;

        if self.iframe_timer > 0.0 {
            self.iframe_timer = (self.iframe_timer - dt_seconds).max(0.0);
        }
        if let Some(VisualEffect::Flash { remaining_seconds }) = self.effect {
            let remaining_seconds = remaining_seconds - dt_seconds;
            self.effect = (remaining_seconds > 0.0)
                .then_some(VisualEffect::Flash { remaining_seconds });
        }
    }

    pub fn animate(&mut self, dt_seconds: f32, frame_count: usize) {
        let kind = if self.iframe_timer > 0.0 {
            AnimationKind::Hurt
        } else if self.velocity.is_zero() {
            AnimationKind::Idle
        } else {
            AnimationKind::Walk
        };
        self.animation.advance(kind, dt_seconds, frame_count);
    }

    pub fn is_alive(&self) -> bool {
        self.health >= 1
    }

    pub fn can_deal_damage(&self) -> bool {
        self.is_alive() && !self.marked_for_deletion
    }

    pub fn is_invincible(&self) -> bool {
        self.iframe_timer > 0.0
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion
    }

    pub(crate) fn mark_for_deletion(&mut self) {
        self.marked_for_deletion = true;
    }
}
