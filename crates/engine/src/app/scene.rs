use std::collections::BTreeMap;
use std::mem;

use tracing::{debug, error, info};

use crate::content::AssetProvider;
use crate::events::EventBus;

use super::input::InputSnapshot;
use super::rendering::Renderer;

pub type SceneFactory = Box<dyn Fn() -> Box<dyn Scene>>;

/// Structural change a running scene asks the manager for. Applied after the
/// current pass over the scene map finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneRequest {
    Start(String),
    Stop(String),
    SetActive(String, bool),
    SetPaused(String, bool),
}

#[derive(Debug, Default)]
pub struct SceneRequests {
    requests: Vec<SceneRequest>,
}

impl SceneRequests {
    pub fn start(&mut self, name: &str) {
        self.requests.push(SceneRequest::Start(name.to_string()));
    }

    pub fn stop(&mut self, name: &str) {
        self.requests.push(SceneRequest::Stop(name.to_string()));
    }

    pub fn set_active(&mut self, name: &str, active: bool) {
        self.requests
            .push(SceneRequest::SetActive(name.to_string(), active));
    }

    pub fn set_paused(&mut self, name: &str, paused: bool) {
        self.requests
            .push(SceneRequest::SetPaused(name.to_string(), paused));
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn as_slice(&self) -> &[SceneRequest] {
        &self.requests
    }
}

/// Shared services handed to a scene for one lifecycle call.
pub struct SceneContext<'a> {
    pub events: &'a mut EventBus,
    pub input: &'a InputSnapshot,
    pub assets: &'a dyn AssetProvider,
    pub requests: &'a mut SceneRequests,
}

pub trait Scene {
    fn startup(&mut self, ctx: &mut SceneContext<'_>);
    fn update(&mut self, dt_seconds: f32, ctx: &mut SceneContext<'_>);
    fn draw(&self, renderer: &mut dyn Renderer, events: &EventBus);
    fn teardown(&mut self, ctx: &mut SceneContext<'_>);
}

struct Registration {
    factory: SceneFactory,
    priority: i32,
}

struct SceneSlot {
    scene: Box<dyn Scene>,
    priority: i32,
    active: bool,
    paused: bool,
    marked_for_deletion: bool,
}

/// Owns every running scene. Starting and stopping only mark intent; the
/// change happens in [`SceneManager::process_marked_scenes`].
#[derive(Default)]
pub struct SceneManager {
    registry: BTreeMap<String, Registration>,
    scenes: BTreeMap<String, SceneSlot>,
    marked_for_start: Vec<String>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scene constructor under `name`, replacing any previous one.
    pub fn register(
        &mut self,
        name: &str,
        priority: i32,
        factory: impl Fn() -> Box<dyn Scene> + 'static,
    ) {
        let replaced = self
            .registry
            .insert(
                name.to_string(),
                Registration {
                    factory: Box::new(factory),
                    priority,
                },
            )
            .is_some();
        debug!(scene = name, priority, replaced, "scene_registered");
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    /// Started and not marked for deletion.
    pub fn is_running(&self, name: &str) -> bool {
        self.scenes
            .get(name)
            .is_some_and(|slot| !slot.marked_for_deletion)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.scenes.get(name).is_some_and(|slot| slot.active)
    }

    pub fn is_paused(&self, name: &str) -> bool {
        self.scenes.get(name).is_some_and(|slot| slot.paused)
    }

    pub fn running_names(&self) -> Vec<&str> {
        self.scenes
            .iter()
            .filter(|(_, slot)| !slot.marked_for_deletion)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn start(&mut self, name: &str) -> bool {
        if !self.is_registered(name) {
            error!(scene = name, "scene_start_unregistered");
            return false;
        }
        if self.is_running(name) {
            debug!(scene = name, "scene_already_running");
            return false;
        }
        if !self.marked_for_start.iter().any(|pending| pending == name) {
            self.marked_for_start.push(name.to_string());
        }
        true
    }

    pub fn stop(&mut self, name: &str) -> bool {
        if let Some(index) = self
            .marked_for_start
            .iter()
            .position(|pending| pending == name)
        {
            self.marked_for_start.remove(index);
            debug!(scene = name, "scene_start_cancelled");
            return true;
        }
        match self.scenes.get_mut(name) {
            Some(slot) => {
                slot.marked_for_deletion = true;
                true
            }
            None => {
                error!(scene = name, "scene_stop_not_started");
                false
            }
        }
    }

    pub fn set_active(&mut self, name: &str, active: bool) -> bool {
        match self.scenes.get_mut(name) {
            Some(slot) => {
                slot.active = active;
                true
            }
            None => {
                debug!(scene = name, active, "scene_set_active_missing");
                false
            }
        }
    }

    pub fn set_paused(&mut self, name: &str, paused: bool) -> bool {
        match self.scenes.get_mut(name) {
            Some(slot) => {
                slot.paused = paused;
                true
            }
            None => {
                debug!(scene = name, paused, "scene_set_paused_missing");
                false
            }
        }
    }

    /// Tears down scenes marked for deletion, then constructs and starts the
    /// scenes marked for start.
    pub fn process_marked_scenes(
        &mut self,
        events: &mut EventBus,
        input: &InputSnapshot,
        assets: &dyn AssetProvider,
    ) {
        let mut requests = SceneRequests::default();

        let doomed: Vec<String> = self
            .scenes
            .iter()
            .filter(|(_, slot)| slot.marked_for_deletion)
            .map(|(name, _)| name.clone())
            .collect();
        for name in doomed {
            if let Some(mut slot) = self.scenes.remove(&name) {
                let mut ctx = SceneContext {
                    events: &mut *events,
                    input,
                    assets,
                    requests: &mut requests,
                };
                slot.scene.teardown(&mut ctx);
                info!(scene = %name, "scene_ended");
            }
        }

        for name in mem::take(&mut self.marked_for_start) {
            if self.scenes.contains_key(&name) {
                debug!(scene = %name, "scene_already_running");
                continue;
            }
            let Some(registration) = self.registry.get(&name) else {
                error!(scene = %name, "scene_start_unregistered");
                continue;
            };
            let mut scene = (registration.factory)();
            let priority = registration.priority;
            let mut ctx = SceneContext {
                events: &mut *events,
                input,
                assets,
                requests: &mut requests,
            };
            scene.startup(&mut ctx);
            info!(scene = %name, priority, "scene_started");
            self.scenes.insert(
                name,
                SceneSlot {
                    scene,
                    priority,
                    active: true,
                    paused: false,
                    marked_for_deletion: false,
                },
            );
        }

        self.apply_requests(requests);
    }

    /// Updates every active, unpaused scene in name order.
    pub fn update(
        &mut self,
        dt_seconds: f32,
        events: &mut EventBus,
        input: &InputSnapshot,
        assets: &dyn AssetProvider,
    ) {
        let mut requests = SceneRequests::default();
        for slot in self.scenes.values_mut() {
            if !slot.active || slot.paused || slot.marked_for_deletion {
                continue;
            }
            let mut ctx = SceneContext {
                events: &mut *events,
                input,
                assets,
                requests: &mut requests,
            };
            slot.scene.update(dt_seconds, &mut ctx);
        }
        self.apply_requests(requests);
    }

    /// Draws active scenes from lowest to highest priority. Paused scenes
    /// still draw.
    pub fn draw(&self, renderer: &mut dyn Renderer, events: &EventBus) {
        let mut visible: Vec<&SceneSlot> = self
            .scenes
            .values()
            .filter(|slot| slot.active && !slot.marked_for_deletion)
            .collect();
        visible.sort_by_key(|slot| slot.priority);
        for slot in visible {
            slot.scene.draw(renderer, events);
        }
    }

    /// Tears down every running scene immediately.
    pub fn shutdown(
        &mut self,
        events: &mut EventBus,
        input: &InputSnapshot,
        assets: &dyn AssetProvider,
    ) {
        self.marked_for_start.clear();
        let mut requests = SceneRequests::default();
        for (name, mut slot) in mem::take(&mut self.scenes) {
            let mut ctx = SceneContext {
                events: &mut *events,
                input,
                assets,
                requests: &mut requests,
            };
            slot.scene.teardown(&mut ctx);
            info!(scene = %name, "scene_ended");
        }
    }

    fn apply_requests(&mut self, requests: SceneRequests) {
        for request in requests.requests {
            match request {
                SceneRequest::Start(name) => {
                    self.start(&name);
                }
                SceneRequest::Stop(name) => {
                    self.stop(&name);
                }
                SceneRequest::SetActive(name, active) => {
                    self.set_active(&name, active);
                }
                SceneRequest::SetPaused(name, paused) => {
                    self.set_paused(&name, paused);
                }
            }
        }
    }
}
