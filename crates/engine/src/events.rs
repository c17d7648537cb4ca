//! Process-wide publish/subscribe bus with delayed, conditional and repeating
//! dispatch.
//!
//! `publish` stores the payload as the latest value for its key and then calls
//! every listener registered for that key synchronously, in subscription
//! order. The listener list is copied before dispatch, so a listener that
//! subscribes to the same key while it is being published is not called for
//! that publish. Listeners receive `&mut EventBus` and may publish or schedule
//! further work reentrantly.
//!
//! `tick` must run exactly once per simulation frame before any other
//! subsystem consumes events for that frame.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::entity::EntityId;
use crate::geometry::Vec2;

pub type Listener = Rc<dyn Fn(&mut EventBus, &EventPayload)>;
pub type OnceCallback = Box<dyn FnOnce(&mut EventBus)>;
pub type TickCallback = Box<dyn FnMut(&mut EventBus)>;
pub type Predicate = Box<dyn FnMut(&EventBus) -> bool>;

#[derive(Debug, Clone, PartialEq)]
pub struct TeleportTarget {
    pub map: String,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    None,
    Number(f32),
    Text(String),
    Entity(EntityId),
    Item { key: String, amount: i32 },
    Teleport(TeleportTarget),
}

impl EventPayload {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_teleport(&self) -> Option<&TeleportTarget> {
        match self {
            Self::Teleport(target) => Some(target),
            _ => None,
        }
    }
}

/// Event keys shared between the engine behaviors and the game scenes.
pub mod keys {
    use crate::entity::EntityId;

    pub const TELEPORT: &str = "teleport";
    pub const ITEM_DELTA: &str = "item_delta";
    pub const SHOW_TEXT: &str = "show_text";
    pub const HIDE_TEXT: &str = "hide_text";
    pub const NOTICE: &str = "notice";
    pub const PLAY_SOUND: &str = "play_sound";
    pub const HEALED: &str = "healed";
    pub const WEAPON_FINISHED: &str = "weapon_finished";
    pub const ROOM_CLEARED: &str = "room_cleared";
    pub const START_CUTSCENE: &str = "start_cutscene";
    pub const PLAYER_HEALTH: &str = "player_health";
    pub const PLAYER_MAX_HEALTH: &str = "player_max_health";
    pub const PLAYER_DEFEATED: &str = "player_defeated";

    pub fn kill_entity(id: EntityId) -> String {
        format!("kill_entity_{}", id.0)
    }

    pub fn object_opened(object_id: u32) -> String {
        format!("object_opened_{object_id}")
    }

    pub fn dialogue_progress(object_id: u32) -> String {
        format!("dialogue_progress_{object_id}")
    }
}

struct DelayedEvent {
    key: String,
    remaining_seconds: f32,
    payload: EventPayload,
    on_fire: Option<OnceCallback>,
}

struct ConditionalEvent {
    predicate: Predicate,
    on_fire: OnceCallback,
}

struct RepeatingEvent {
    key: String,
    interval_seconds: f32,
    remaining_seconds: f32,
    payload: EventPayload,
    on_tick: Option<TickCallback>,
    repeats_left: u32,
    on_complete: Option<OnceCallback>,
}

#[derive(Default)]
pub struct EventBus {
    latest: HashMap<String, EventPayload>,
    listeners: HashMap<String, Vec<Listener>>,
    delayed: Vec<DelayedEvent>,
    conditional: Vec<ConditionalEvent>,
    repeating: Vec<RepeatingEvent>,
    ticking: bool,
    cancelled_during_tick: Vec<String>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("latest", &self.latest)
            .field("listener_keys", &self.listeners.len())
            .field("delayed", &self.delayed.len())
            .field("conditional", &self.conditional.len())
            .field("repeating", &self.repeating.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, key: &str, payload: EventPayload) {
        self.latest.insert(key.to_string(), payload.clone());
        let Some(listeners) = self.listeners.get(key) else {
            return;
        };
        let snapshot: Vec<Listener> = listeners.clone();
        for listener in snapshot {
            listener(self, &payload);
        }
    }

    pub fn subscribe(
        &mut self,
        key: &str,
        listener: impl Fn(&mut EventBus, &EventPayload) + 'static,
    ) {
        self.listeners
            .entry(key.to_string())
            .or_default()
            .push(Rc::new(listener));
    }

    /// Removes every listener registered for `key`.
    pub fn unsubscribe(&mut self, key: &str) {
        self.listeners.remove(key);
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.listeners.get(key).map_or(0, Vec::len)
    }

    pub fn latest(&self, key: &str) -> Option<&EventPayload> {
        self.latest.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.latest.contains_key(key)
    }

    /// Returns and clears the latest payload for `key`.
    pub fn take(&mut self, key: &str) -> Option<EventPayload> {
        self.latest.remove(key)
    }

    pub fn clear(&mut self, key: &str) {
        self.latest.remove(key);
    }

    pub fn schedule_delayed(
        &mut self,
        key: &str,
        delay_seconds: f32,
        payload: EventPayload,
        on_fire: Option<OnceCallback>,
    ) {
        self.delayed.push(DelayedEvent {
            key: key.to_string(),
            remaining_seconds: delay_seconds,
            payload,
            on_fire,
        });
    }

    pub fn schedule_conditional(
        &mut self,
        predicate: impl FnMut(&EventBus) -> bool + 'static,
        on_fire: impl FnOnce(&mut EventBus) + 'static,
    ) {
        self.conditional.push(ConditionalEvent {
            predicate: Box::new(predicate),
            on_fire: Box::new(on_fire),
        });
    }

    pub fn schedule_repeating(
        &mut self,
        key: &str,
        interval_seconds: f32,
        payload: EventPayload,
        on_tick: Option<TickCallback>,
        repeat_count: u32,
        on_complete: Option<OnceCallback>,
    ) {
        self.repeating.push(RepeatingEvent {
            key: key.to_string(),
            interval_seconds,
            remaining_seconds: interval_seconds,
            payload,
            on_tick,
            repeats_left: repeat_count,
            on_complete,
        });
    }

    /// Removes every repeating entry with `key` without calling its completion
    /// callback.
    pub fn cancel(&mut self, key: &str) {
        self.repeating.retain(|event| event.key != key);
        if self.ticking {
            self.cancelled_during_tick.push(key.to_string());
        }
    }

    pub fn pending_delayed(&self) -> usize {
        self.delayed.len()
    }

    pub fn pending_conditional(&self) -> usize {
        self.conditional.len()
    }

    pub fn pending_repeating(&self) -> usize {
        self.repeating.len()
    }

    /// Drops all scheduled work and listeners. Latest values survive.
    pub fn reset_scheduled(&mut self) {
        self.delayed.clear();
        self.conditional.clear();
        self.repeating.clear();
        self.listeners.clear();
    }

    pub fn tick(&mut self, dt_seconds: f32) {
        self.tick_delayed(dt_seconds);
        self.tick_conditional();
        self.tick_repeating(dt_seconds);
    }

    fn tick_delayed(&mut self, dt_seconds: f32) {
        let scheduled = std::mem::take(&mut self.delayed);
        let mut due = Vec::new();
        for mut event in scheduled {
            event.remaining_seconds -= dt_seconds;
            if event.remaining_seconds <= 0.0 {
                due.push(event);
            } else {
                self.delayed.push(event);
            }
        }

        for event in due {
            if let Some(on_fire) = event.on_fire {
                on_fire(self);
            }
            self.publish(&event.key, event.payload);
        }
    }

    fn tick_conditional(&mut self) {
        let scheduled = std::mem::take(&mut self.conditional);
        let mut fired = Vec::new();
        let mut waiting = Vec::with_capacity(scheduled.len());
        for mut event in scheduled {
            if (event.predicate)(&*self) {
                fired.push(event.on_fire);
            } else {
                waiting.push(event);
            }
        }
        self.conditional = waiting;

        for on_fire in fired {
            on_fire(self);
        }
    }

    fn tick_repeating(&mut self, dt_seconds: f32) {
        self.ticking = true;
        let scheduled = std::mem::take(&mut self.repeating);
        let mut kept = Vec::with_capacity(scheduled.len());

        'entries: for mut event in scheduled {
            if self.cancelled_during_tick.contains(&event.key) {
                continue;
            }
            event.remaining_seconds -= dt_seconds;
            while event.remaining_seconds <= 0.0 && event.repeats_left > 0 {
                if let Some(on_tick) = event.on_tick.as_mut() {
                    on_tick(self);
                }
                self.publish(&event.key, event.payload.clone());
                event.repeats_left -= 1;
                event.remaining_seconds += event.interval_seconds;
                if self.cancelled_during_tick.contains(&event.key) {
                    continue 'entries;
                }
            }

            if event.repeats_left == 0 {
                if let Some(on_complete) = event.on_complete.take() {
                    on_complete(self);
                }
            } else {
                kept.push(event);
            }
        }

        let cancelled = std::mem::take(&mut self.cancelled_during_tick);
        kept.retain(|event| !cancelled.contains(&event.key));
        kept.append(&mut self.repeating);
        self.repeating = kept;
        self.ticking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn publish_calls_listeners_in_subscription_order() {
        let mut bus = EventBus::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        for index in 0..3 {
            let calls = Rc::clone(&calls);
            bus.subscribe("door", move |_, _| calls.borrow_mut().push(index));
        }

        bus.publish("door", EventPayload::None);

        assert_eq!(*calls.borrow(), vec![0, 1, 2]);
        assert_eq!(bus.latest("door"), Some(&EventPayload::None));
    }

    #[test]
    fn listener_added_during_dispatch_misses_current_publish() {
        let mut bus = EventBus::new();
        let late_calls = Rc::new(Cell::new(0));
        let late_for_listener = Rc::clone(&late_calls);
        bus.subscribe("chest", move |bus, _| {
            let late = Rc::clone(&late_for_listener);
            bus.subscribe("chest", move |_, _| late.set(late.get() + 1));
        });

        bus.publish("chest", EventPayload::None);
        assert_eq!(late_calls.get(), 0);
        assert_eq!(bus.listener_count("chest"), 2);

        bus.publish("chest", EventPayload::None);
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn reentrant_publish_reaches_other_keys() {
        let mut bus = EventBus::new();
        let seen = Rc::new(Cell::new(0.0));
        let seen_for_listener = Rc::clone(&seen);
        bus.subscribe("hit", |bus, payload| {
            bus.publish("damage", payload.clone());
        });
        bus.subscribe("damage", move |_, payload| {
            seen_for_listener.set(payload.as_number().unwrap_or(-1.0));
        });

        bus.publish("hit", EventPayload::Number(3.0));
        assert_eq!(seen.get(), 3.0);
    }

    #[test]
    fn unsubscribe_removes_every_listener_for_key() {
        let mut bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));
        for _ in 0..4 {
            let calls = Rc::clone(&calls);
            bus.subscribe("killed", move |_, _| calls.set(calls.get() + 1));
        }
        bus.unsubscribe("killed");
        bus.publish("killed", EventPayload::None);
        assert_eq!(calls.get(), 0);
        assert_eq!(bus.listener_count("killed"), 0);
    }

    #[test]
    fn take_clears_latest_value() {
        let mut bus = EventBus::new();
        bus.publish("notice", EventPayload::Text("first".to_string()));
        bus.publish("notice", EventPayload::Text("second".to_string()));
        assert_eq!(
            bus.take("notice"),
            Some(EventPayload::Text("second".to_string()))
        );
        assert!(!bus.has("notice"));
    }

    #[test]
    fn delayed_event_fires_once_when_delay_elapses() {
        let mut bus = EventBus::new();
        let fired = Rc::new(Cell::new(0));
        let published = Rc::new(Cell::new(0));
        let fired_cb = Rc::clone(&fired);
        let published_cb = Rc::clone(&published);
        bus.subscribe("teleport", move |_, _| published_cb.set(published_cb.get() + 1));
        bus.schedule_delayed(
            "teleport",
            1.0,
            EventPayload::None,
            Some(Box::new(move |_: &mut EventBus| fired_cb.set(fired_cb.get() + 1))),
        );

        bus.tick(0.5);
        bus.tick(0.25);
        assert_eq!(fired.get(), 0);
        assert_eq!(published.get(), 0);

        bus.tick(0.25);
        assert_eq!(fired.get(), 1);
        assert_eq!(published.get(), 1);

        bus.tick(5.0);
        assert_eq!(published.get(), 1);
        assert_eq!(bus.pending_delayed(), 0);
    }

    #[test]
    fn delayed_events_with_same_key_are_independent() {
        let mut bus = EventBus::new();
        let published = Rc::new(Cell::new(0));
        let published_cb = Rc::clone(&published);
        bus.subscribe("sound", move |_, _| published_cb.set(published_cb.get() + 1));
        bus.schedule_delayed("sound", 0.5, EventPayload::None, None);
        bus.schedule_delayed("sound", 0.5, EventPayload::None, None);

        bus.tick(0.5);
        assert_eq!(published.get(), 2);
    }

    #[test]
    fn conditional_fires_exactly_once_on_first_true_tick() {
        let mut bus = EventBus::new();
        let ticks = Rc::new(Cell::new(0));
        let fired_on = Rc::new(Cell::new(None));
        let fire_count = Rc::new(Cell::new(0));

        let ticks_pred = Rc::clone(&ticks);
        let ticks_fire = Rc::clone(&ticks);
        let fired_on_cb = Rc::clone(&fired_on);
        let fire_count_cb = Rc::clone(&fire_count);
        bus.schedule_conditional(
            move |_| {
                ticks_pred.set(ticks_pred.get() + 1);
                ticks_pred.get() >= 6
            },
            move |_| {
                fired_on_cb.set(Some(ticks_fire.get()));
                fire_count_cb.set(fire_count_cb.get() + 1);
            },
        );

        for _ in 0..5 {
            bus.tick(1.0 / 60.0);
            assert_eq!(fire_count.get(), 0);
        }
        bus.tick(1.0 / 60.0);
        assert_eq!(fired_on.get(), Some(6));

        for _ in 0..10 {
            bus.tick(1.0 / 60.0);
        }
        assert_eq!(fire_count.get(), 1);
        assert_eq!(bus.pending_conditional(), 0);
    }

    #[test]
    fn repeating_event_ticks_k_times_then_completes_once() {
        let mut bus = EventBus::new();
        let ticks = Rc::new(Cell::new(0));
        let completions = Rc::new(Cell::new(0));
        let ticks_at_completion = Rc::new(Cell::new(0));

        let ticks_cb = Rc::clone(&ticks);
        let ticks_seen = Rc::clone(&ticks);
        let completions_cb = Rc::clone(&completions);
        let at_completion = Rc::clone(&ticks_at_completion);
        bus.schedule_repeating(
            "flash",
            0.25,
            EventPayload::None,
            Some(Box::new(move |_: &mut EventBus| ticks_cb.set(ticks_cb.get() + 1))),
            3,
            Some(Box::new(move |_: &mut EventBus| {
                completions_cb.set(completions_cb.get() + 1);
                at_completion.set(ticks_seen.get());
            })),
        );

        bus.tick(0.25);
        bus.tick(0.25);
        assert_eq!(ticks.get(), 2);
        assert_eq!(completions.get(), 0);

        bus.tick(0.25);
        assert_eq!(ticks.get(), 3);
        assert_eq!(completions.get(), 1);
        assert_eq!(ticks_at_completion.get(), 3);

        bus.tick(1.0);
        assert_eq!(ticks.get(), 3);
        assert_eq!(completions.get(), 1);
        assert_eq!(bus.pending_repeating(), 0);
    }

    #[test]
    fn cancel_stops_repeating_without_completion() {
        let mut bus = EventBus::new();
        let ticks = Rc::new(Cell::new(0));
        let completions = Rc::new(Cell::new(0));
        let ticks_cb = Rc::clone(&ticks);
        let completions_cb = Rc::clone(&completions);
        bus.schedule_repeating(
            "blink",
            0.5,
            EventPayload::None,
            Some(Box::new(move |_: &mut EventBus| ticks_cb.set(ticks_cb.get() + 1))),
            10,
            Some(Box::new(move |_: &mut EventBus| completions_cb.set(completions_cb.get() + 1))),
        );

        bus.tick(0.5);
        bus.cancel("blink");
        bus.tick(0.5);
        bus.tick(0.5);

        assert_eq!(ticks.get(), 1);
        assert_eq!(completions.get(), 0);
    }

    #[test]
    fn cancel_from_inside_tick_callback_stops_entry() {
        let mut bus = EventBus::new();
        let ticks = Rc::new(Cell::new(0));
        let ticks_cb = Rc::clone(&ticks);
        bus.schedule_repeating(
            "pulse",
            0.25,
            EventPayload::None,
            Some(Box::new(move |bus: &mut EventBus| {
                ticks_cb.set(ticks_cb.get() + 1);
                bus.cancel("pulse");
            })),
            5,
            None,
        );

        bus.tick(1.0);
        assert_eq!(ticks.get(), 1);
        assert_eq!(bus.pending_repeating(), 0);
    }
}
