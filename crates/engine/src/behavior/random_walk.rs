use rand::Rng;

use crate::geometry::{Direction, Rect, Vec2};

use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

const MAX_WAYPOINT_ATTEMPTS: usize = 10;
const MIN_STEP_TILES: i32 = 1;
const MAX_STEP_TILES: i32 = 4;
const MIN_WAIT_SECONDS: f32 = 1.0;
const MAX_WAIT_SECONDS: f32 = 5.0;

/// Wanders between random cardinal waypoints one to four tiles away, pausing
/// on arrival.
#[derive(Debug, Clone, Default)]
pub struct RandomWalk {
    waypoint: Option<Vec2>,
    wait_seconds: f32,
}

impl RandomWalk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waypoint(&self) -> Option<Vec2> {
        self.waypoint
    }

    pub fn is_waiting(&self) -> bool {
        self.wait_seconds > 0.0
    }

    fn pick_waypoint(ctx: &mut BehaviorContext<'_>, rect: Rect, position: Vec2) -> Option<Vec2> {
        for _ in 0..MAX_WAYPOINT_ATTEMPTS {
            let direction = Direction::ALL[ctx.rng.gen_range(0..Direction::ALL.len())];
            let tiles = ctx.rng.gen_range(MIN_STEP_TILES..=MAX_STEP_TILES);
            let distance = tiles * ctx.tile_size;
            let unit = direction.unit();
            let (dx, dy) = (unit.x as i32 * distance, unit.y as i32 * distance);
            if path_is_clear(rect, dx, dy, ctx.obstacles, ctx.room_bounds) {
                return Some(position + Vec2::new(dx as f32, dy as f32));
            }
        }
        None
    }
}

/// A straight cardinal move sweeps the union of the start and end rects, so
/// that union must stay inside the room and off every obstacle.
fn path_is_clear(rect: Rect, dx: i32, dy: i32, obstacles: &[Rect], bounds: Rect) -> bool {
    let end = rect.translated(dx, dy);
    let left = rect.left().min(end.left());
    let top = rect.top().min(end.top());
    let swept = Rect::new(
        left,
        top,
        rect.right().max(end.right()) - left,
        rect.bottom().max(end.bottom()) - top,
    );
    bounds.contains_rect(&swept) && !obstacles.iter().any(|obstacle| obstacle.intersects(&swept))
}

impl Behavior for RandomWalk {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::RandomWalk
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        if self.wait_seconds > 0.0 {
            self.wait_seconds = (self.wait_seconds - ctx.dt_seconds).max(0.0);
            return Ok(());
        }
        let Some((rect, position, colliding, step)) = ctx.owner().map(|owner| {
            (
                owner.rect(),
                owner.position(),
                owner.flags.colliding,
                owner.velocity.length(),
            )
        }) else {
            return Ok(());
        };

        let Some(waypoint) = self.waypoint else {
            self.waypoint = Self::pick_waypoint(ctx, rect, position);
            return Ok(());
        };

        let offset = waypoint - position;
        if colliding || offset.length() <= step.max(1.0) {
            self.waypoint = None;
            self.wait_seconds = ctx.rng.gen_range(MIN_WAIT_SECONDS..=MAX_WAIT_SECONDS);
            return Ok(());
        }

        if let Some(owner) = ctx.owner_mut() {
            owner.acceleration += offset.normalized();
            if let Some(direction) = Direction::from_vector(offset) {
                owner.facing = direction;
            }
        }
        Ok(())
    }
}
