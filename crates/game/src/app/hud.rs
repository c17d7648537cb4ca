use engine::app::Rgba;
use engine::events::keys;
use engine::{EventBus, EventPayload, Rect, Renderer, Scene, SceneContext, Viewport};
use tracing::debug;

use super::INVENTORY_TEXT_KEY;

const NOTICE_SECONDS: f32 = 2.0;
const TEXTBOX_HEIGHT: i32 = 40;
const TEXTBOX_MARGIN: i32 = 8;
const TEXTBOX_COLOR: Rgba = Rgba(16, 16, 40, 230);
const LINE_HEIGHT: i32 = 10;

/// Overlay for player vitals, the inventory line, the text box and short
/// notices. Reads everything from the event bus; owns no game state.
pub(crate) struct HudScene {
    viewport: Viewport,
    textbox: Option<String>,
    notice: Option<(String, f32)>,
}

impl HudScene {
    pub(crate) fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            textbox: None,
            notice: None,
        }
    }
}

impl Scene for HudScene {
    fn startup(&mut self, ctx: &mut SceneContext<'_>) {
        ctx.events.clear(keys::SHOW_TEXT);
        ctx.events.clear(keys::HIDE_TEXT);
    }

    fn update(&mut self, dt_seconds: f32, ctx: &mut SceneContext<'_>) {
        if ctx.events.take(keys::HIDE_TEXT).is_some() {
            self.textbox = None;
        }
        if let Some(payload) = ctx.events.take(keys::SHOW_TEXT) {
            self.textbox = payload.as_text().map(str::to_string);
        }
        if let Some(EventPayload::Text(text)) = ctx.events.take(keys::NOTICE) {
            self.notice = Some((text, NOTICE_SECONDS));
        }
        if let Some(EventPayload::Text(name)) = ctx.events.take(keys::PLAY_SOUND) {
            if let Some(sound) = ctx.assets.sound_by_key(&name) {
                debug!(sound = %sound.0, "sound_cue");
            }
        }

        if let Some((_, remaining)) = &mut self.notice {
            *remaining -= dt_seconds;
        }
        if self
            .notice
            .as_ref()
            .is_some_and(|(_, remaining)| *remaining <= 0.0)
        {
            self.notice = None;
        }
    }

    fn draw(&self, renderer: &mut dyn Renderer, events: &EventBus) {
        let health = events
            .latest(keys::PLAYER_HEALTH)
            .and_then(EventPayload::as_number)
            .unwrap_or(0.0);
        let max_health = events
            .latest(keys::PLAYER_MAX_HEALTH)
            .and_then(EventPayload::as_number)
            .unwrap_or(health);
        renderer.text(&format!("HP {health:.0}/{max_health:.0}"), 4, 4);
        if let Some(items) = events
            .latest(INVENTORY_TEXT_KEY)
            .and_then(EventPayload::as_text)
            .filter(|items| !items.is_empty())
        {
            renderer.text(items, 4, 4 + LINE_HEIGHT);
        }

        let width = self.viewport.width as i32;
        let height = self.viewport.height as i32;
        if let Some(text) = &self.textbox {
            let panel = Rect::new(
                TEXTBOX_MARGIN,
                height - TEXTBOX_HEIGHT - TEXTBOX_MARGIN,
                width - TEXTBOX_MARGIN * 2,
                TEXTBOX_HEIGHT,
            );
            renderer.fill(panel, TEXTBOX_COLOR);
            renderer.text(text, panel.x + 6, panel.y + 6);
        }
        if let Some((notice, _)) = &self.notice {
            renderer.text(notice, TEXTBOX_MARGIN, height / 2);
        }
    }

    fn teardown(&mut self, _ctx: &mut SceneContext<'_>) {
        self.textbox = None;
        self.notice = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::app::{InputSnapshot, RecordingRenderer, SceneRequests};
    use engine::AssetRegistry;

    const VIEWPORT: Viewport = Viewport {
        width: 256,
        height: 224,
    };

    fn step(hud: &mut HudScene, events: &mut EventBus, dt_seconds: f32) {
        let assets = AssetRegistry::new();
        let input = InputSnapshot::empty();
        let mut requests = SceneRequests::default();
        let mut ctx = SceneContext {
            events,
            input: &input,
            assets: &assets,
            requests: &mut requests,
        };
        hud.update(dt_seconds, &mut ctx);
    }

    #[test]
    fn draws_vitals_and_inventory_from_latest_values() {
        let mut events = EventBus::new();
        events.publish(keys::PLAYER_HEALTH, EventPayload::Number(7.0));
        events.publish(keys::PLAYER_MAX_HEALTH, EventPayload::Number(10.0));
        events.publish(INVENTORY_TEXT_KEY, EventPayload::Text("coin x5".to_string()));
        let hud = HudScene::new(VIEWPORT);

        let mut renderer = RecordingRenderer::default();
        hud.draw(&mut renderer, &events);
        assert_eq!(renderer.texts(), vec!["HP 7/10", "coin x5"]);
    }

    #[test]
    fn textbox_follows_show_and_hide() {
        let mut events = EventBus::new();
        let mut hud = HudScene::new(VIEWPORT);

        events.publish(keys::SHOW_TEXT, EventPayload::Text("Hello.".to_string()));
        step(&mut hud, &mut events, 0.016);
        assert_eq!(hud.textbox.as_deref(), Some("Hello."));
        assert!(!events.has(keys::SHOW_TEXT));

        events.publish(keys::HIDE_TEXT, EventPayload::None);
        step(&mut hud, &mut events, 0.016);
        assert_eq!(hud.textbox, None);
    }

    #[test]
    fn notice_expires() {
        let mut events = EventBus::new();
        let mut hud = HudScene::new(VIEWPORT);
        events.publish(keys::NOTICE, EventPayload::Text("Got a key.".to_string()));

        step(&mut hud, &mut events, 1.0);
        let mut renderer = RecordingRenderer::default();
        hud.draw(&mut renderer, &events);
        assert!(renderer.texts().contains(&"Got a key."));

        step(&mut hud, &mut events, 1.5);
        assert!(hud.notice.is_none());
    }
}
