use crate::entity::VisualEffect;
use crate::geometry::Vec2;

use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

pub const DEFAULT_DEATH_SECONDS: f32 = 0.5;

/// Dissolves the owner over `lifetime_seconds`, then hides it. Removing the
/// entity is left to the scene, which watches for the finished behavior.
#[derive(Debug, Clone)]
pub struct Death {
    lifetime_seconds: f32,
    elapsed_seconds: f32,
    done: bool,
}

impl Default for Death {
    fn default() -> Self {
        Self::new(DEFAULT_DEATH_SECONDS)
    }
}

impl Death {
    pub fn new(lifetime_seconds: f32) -> Self {
        Self {
            lifetime_seconds: lifetime_seconds.max(f32::EPSILON),
            elapsed_seconds: 0.0,
            done: false,
        }
    }
}

impl Behavior for Death {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Death
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        self.elapsed_seconds += ctx.dt_seconds;
        let progress = (self.elapsed_seconds / self.lifetime_seconds).min(1.0);
        let finished = progress >= 1.0;
        if let Some(owner) = ctx.owner_mut() {
            owner.effect = Some(VisualEffect::Dissolve { progress });
            owner.acceleration = Vec2::ZERO;
            if finished {
                owner.flags.visible = false;
            }
        }
        self.done = finished;
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::test_support::{Harness, DT};
    use crate::entity::Entity;

    #[test]
    fn dissolves_then_hides_and_reports_done() {
        let mut harness = Harness::new();
        let slime = harness.spawn(
            Entity::new("slime", Vec2::ZERO, (16, 16)).with_behavior(Death::new(DT * 2.5)),
        );

        harness.run(slime);
        let entity = harness.world.get(slime).expect("slime");
        assert!(matches!(
            entity.effect,
            Some(VisualEffect::Dissolve { progress }) if progress > 0.0 && progress < 1.0
        ));
        assert!(!entity.behavior_finished(BehaviorKind::Death));

        harness.run(slime);
        harness.run(slime);
        let entity = harness.world.get(slime).expect("slime");
        assert!(!entity.flags.visible);
        assert!(entity.behavior_finished(BehaviorKind::Death));
    }
}
