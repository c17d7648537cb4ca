use crate::content::AssetProvider;
use crate::events::EventBus;

use super::input::InputSnapshot;
use super::rendering::Renderer;
use super::scene::SceneManager;

/// One simulation: the scene manager, the event bus it shares, and the asset
/// provider every scene reads from.
pub struct Runtime {
    scenes: SceneManager,
    events: EventBus,
    assets: Box<dyn AssetProvider>,
    ticks: u64,
}

impl Runtime {
    pub fn new(assets: Box<dyn AssetProvider>) -> Self {
        Self {
            scenes: SceneManager::new(),
            events: EventBus::new(),
            assets,
            ticks: 0,
        }
    }

    pub fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut SceneManager {
        &mut self.scenes
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn assets(&self) -> &dyn AssetProvider {
        self.assets.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advances one fixed step: pending scene starts/stops, then event timers,
    /// then scene updates.
    pub fn tick(&mut self, dt_seconds: f32, input: &InputSnapshot) {
        self.scenes
            .process_marked_scenes(&mut self.events, input, self.assets.as_ref());
        self.events.tick(dt_seconds);
        self.scenes
            .update(dt_seconds, &mut self.events, input, self.assets.as_ref());
        self.ticks += 1;
    }

    pub fn draw(&self, renderer: &mut dyn Renderer) {
        self.scenes.draw(renderer, &self.events);
    }

    pub fn shutdown(&mut self) {
        let input = InputSnapshot::empty();
        self.scenes
            .shutdown(&mut self.events, &input, self.assets.as_ref());
        self.events.reset_scheduled();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::app::{RecordingRenderer, Scene, SceneContext};
    use crate::content::AssetRegistry;
    use crate::events::EventPayload;

    struct DelayObserver {
        seen: Rc<RefCell<Vec<bool>>>,
    }

    impl Scene for DelayObserver {
        fn startup(&mut self, ctx: &mut SceneContext<'_>) {
            ctx.events
                .schedule_delayed("ping", 0.0, EventPayload::Number(1.0), None);
        }

        fn update(&mut self, _dt_seconds: f32, ctx: &mut SceneContext<'_>) {
            self.seen.borrow_mut().push(ctx.events.has("ping"));
        }

        fn draw(&self, renderer: &mut dyn Renderer, _events: &EventBus) {
            renderer.text("observer", 0, 0);
        }

        fn teardown(&mut self, _ctx: &mut SceneContext<'_>) {}
    }

    #[test]
    fn event_timers_fire_before_scene_updates() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut runtime = Runtime::new(Box::new(AssetRegistry::new()));
        let observed = Rc::clone(&seen);
        runtime.scenes_mut().register("observer", 0, move || {
            Box::new(DelayObserver {
                seen: Rc::clone(&observed),
            })
        });
        runtime.scenes_mut().start("observer");

        runtime.tick(1.0 / 60.0, &InputSnapshot::empty());
        assert_eq!(*seen.borrow(), vec![true]);
        assert_eq!(runtime.ticks(), 1);

        let mut renderer = RecordingRenderer::default();
        runtime.draw(&mut renderer);
        assert_eq!(renderer.texts(), vec!["observer"]);

        runtime.shutdown();
        assert!(runtime.scenes().running_names().is_empty());
        assert_eq!(runtime.events().pending_delayed(), 0);
    }
}
