use engine::app::Rgba;
use engine::{
    EventBus, EventPayload, InputAction, Rect, Renderer, Scene, SceneContext, Viewport,
};
use tracing::info;

use super::{GAMEPLAY_SCENE, LOAD_REQUESTED_KEY, PAUSE_SCENE, SAVE_REQUESTED_KEY};

const OVERLAY_COLOR: Rgba = Rgba(0, 0, 0, 180);

pub(crate) struct PauseScene {
    viewport: Viewport,
}

impl PauseScene {
    pub(crate) fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    fn resume(ctx: &mut SceneContext<'_>) {
        ctx.requests.set_paused(GAMEPLAY_SCENE, false);
        ctx.requests.stop(PAUSE_SCENE);
    }
}

impl Scene for PauseScene {
    fn startup(&mut self, _ctx: &mut SceneContext<'_>) {
        info!("paused");
    }

    fn update(&mut self, _dt_seconds: f32, ctx: &mut SceneContext<'_>) {
        if ctx.input.just_pressed(InputAction::Confirm) {
            ctx.events.publish(SAVE_REQUESTED_KEY, EventPayload::None);
            Self::resume(ctx);
        } else if ctx.input.just_pressed(InputAction::Use) {
            ctx.events.publish(LOAD_REQUESTED_KEY, EventPayload::None);
            Self::resume(ctx);
        } else if ctx.input.just_pressed(InputAction::Cancel) {
            Self::resume(ctx);
        }
    }

    fn draw(&self, renderer: &mut dyn Renderer, _events: &EventBus) {
        let width = self.viewport.width as i32;
        let height = self.viewport.height as i32;
        renderer.fill(Rect::new(0, 0, width, height), OVERLAY_COLOR);
        renderer.text("PAUSED", width / 2 - 18, height / 2 - 20);
        renderer.text("Confirm: save", width / 2 - 40, height / 2);
        renderer.text("Use: load", width / 2 - 40, height / 2 + 10);
        renderer.text("Cancel: resume", width / 2 - 40, height / 2 + 20);
    }

    fn teardown(&mut self, _ctx: &mut SceneContext<'_>) {
        info!("resumed");
    }
}
