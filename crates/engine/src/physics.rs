//! Axis-separated collision resolution and contact damage.

use crate::entity::{Entity, VisualEffect};
use crate::geometry::{Direction, Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub damage: i32,
    pub remaining_health: i32,
    pub knockback: Vec2,
}

impl DamageOutcome {
    pub fn killed(&self) -> bool {
        self.remaining_health < 1
    }
}

fn blocked(rect: &Rect, obstacles: &[Rect]) -> bool {
    obstacles.iter().any(|obstacle| obstacle.intersects(rect))
}

/// Replays the move from `previous` to the entity's current position one axis
/// at a time, cancelling the component that would overlap an obstacle. Sets
/// the `colliding` flag and zeroes the blocked velocity component. Returns
/// whether anything was hit.
pub fn resolve_static(entity: &mut Entity, previous: Vec2, obstacles: &[Rect]) -> bool {
    let target = entity.position();
    let mut hit = false;

    entity.set_position(Vec2::new(target.x, previous.y));
    if target.x != previous.x && blocked(&entity.rect(), obstacles) {
        entity.set_position(previous);
        entity.velocity.x = 0.0;
        hit = true;
    }

    let x = entity.position().x;
    entity.set_position(Vec2::new(x, target.y));
    if target.y != previous.y && blocked(&entity.rect(), obstacles) {
        entity.set_position(Vec2::new(x, previous.y));
        entity.velocity.y = 0.0;
        hit = true;
    }

    entity.flags.colliding = hit;
    hit
}

/// Whether `source` is allowed to damage `target`.
pub fn is_hostile(source: &Entity, target: &Entity, target_is_player: bool) -> bool {
    if source.id == target.id || !source.can_deal_damage() || source.damage <= 0 {
        return false;
    }
    (target_is_player && source.flags.can_hurt_player)
        || (target.flags.enemy && source.flags.can_hurt_enemies)
}

/// Applies `source`'s contact damage to `target` if their hurtboxes overlap
/// and the target is not invincible. The target is knocked away from the
/// source's center and becomes invincible for `iframe_seconds`.
pub fn apply_contact_damage(
    source: &Entity,
    target: &mut Entity,
    iframe_seconds: f32,
) -> Option<DamageOutcome> {
    if target.is_invincible() || !target.is_alive() {
        return None;
    }
    if !source.hurtbox().intersects(&target.hurtbox()) {
        return None;
    }

    let mut away = (target.center() - source.center()).normalized();
    if away.is_zero() {
        away = target.facing.opposite().unit();
    }
    let knockback = away * source.knockback;

    target.health -= source.damage;
    target.iframe_timer = iframe_seconds;
    target.velocity = knockback;
    target.effect = Some(VisualEffect::Flash {
        remaining_seconds: iframe_seconds,
    });

    Some(DamageOutcome {
        damage: source.damage,
        remaining_health: target.health,
        knockback,
    })
}

/// Edge of `bounds` that `point` has crossed, if any.
pub fn exited_edge(bounds: Rect, point: Vec2) -> Option<Direction> {
    if point.x < bounds.left() as f32 {
        Some(Direction::Left)
    } else if point.x >= bounds.right() as f32 {
        Some(Direction::Right)
    } else if point.y < bounds.top() as f32 {
        Some(Direction::Up)
    } else if point.y >= bounds.bottom() as f32 {
        Some(Direction::Down)
    } else {
        None
    }
}

/// Pulls the entity back so its rect lies inside `bounds`.
pub fn clamp_inside(entity: &mut Entity, bounds: Rect) {
    let rect = entity.rect();
    let mut position = entity.position();
    let max_x = (bounds.right() - rect.w).max(bounds.left()) as f32;
    let max_y = (bounds.bottom() - rect.h).max(bounds.top()) as f32;
    position.x = position.x.clamp(bounds.left() as f32, max_x);
    position.y = position.y.clamp(bounds.top() as f32, max_y);
    entity.set_position(position);
}
