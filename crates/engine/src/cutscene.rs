//! Scripted command queue driving cutscenes.
//!
//! Blocking commands run one at a time from the head of the queue. A
//! non-blocking command is moved to a concurrent set as soon as it reaches the
//! head and runs alongside whatever follows it. Persistent concurrent commands
//! stay until everything else has drained.

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use crate::app::{Camera2D, InputAction, InputSnapshot, Renderer, Rgba, Viewport};
use crate::entity::EntityId;
use crate::events::{keys, EventBus, EventPayload};
use crate::geometry::{Rect, Vec2};
use crate::world::EntityWorld;

pub const ARRIVAL_EPSILON: f32 = 0.5;

pub struct CommandContext<'a> {
    pub dt_seconds: f32,
    pub world: &'a mut EntityWorld,
    pub events: &'a mut EventBus,
    pub input: &'a InputSnapshot,
    pub camera: &'a mut Camera2D,
}

pub trait Command: fmt::Debug {
    fn update(&mut self, ctx: &mut CommandContext<'_>);
    fn is_done(&self) -> bool;

    fn is_blocking(&self) -> bool {
        true
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn draw(&self, _renderer: &mut dyn Renderer, _viewport: Viewport) {}
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<Box<dyn Command>>,
    concurrent: Vec<Box<dyn Command>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: impl Command + 'static) {
        self.pending.push_back(Box::new(command));
    }

    pub fn push_boxed(&mut self, command: Box<dyn Command>) {
        self.pending.push_back(command);
    }

    /// True while blocking commands are queued or concurrent ones remain.
    pub fn is_active(&self) -> bool {
        !self.pending.is_empty() || !self.concurrent.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn concurrent_len(&self) -> usize {
        self.concurrent.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.concurrent.clear();
    }

    pub fn update(&mut self, ctx: &mut CommandContext<'_>) {
        self.promote_non_blocking();

        if let Some(head) = self.pending.front_mut() {
            head.update(ctx);
            if head.is_done() {
                if let Some(finished) = self.pending.pop_front() {
                    debug!(command = ?finished, "cutscene_command_finished");
                }
                self.promote_non_blocking();
            }
        }

        for command in &mut self.concurrent {
            command.update(ctx);
        }
        self.concurrent
            .retain(|command| command.is_persistent() || !command.is_done());

        if self.pending.is_empty()
            && self
                .concurrent
                .iter()
                .all(|command| command.is_persistent())
        {
            self.concurrent.clear();
        }
    }

    pub fn draw(&self, renderer: &mut dyn Renderer, viewport: Viewport) {
        for command in &self.concurrent {
            command.draw(renderer, viewport);
        }
        if let Some(head) = self.pending.front() {
            head.draw(renderer, viewport);
        }
    }

    fn promote_non_blocking(&mut self) {
        while self
            .pending
            .front()
            .is_some_and(|command| !command.is_blocking())
        {
            if let Some(command) = self.pending.pop_front() {
                self.concurrent.push(command);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Wait {
    remaining_seconds: f32,
}

impl Wait {
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining_seconds: seconds,
        }
    }
}

impl Command for Wait {
    fn update(&mut self, ctx: &mut CommandContext<'_>) {
        self.remaining_seconds -= ctx.dt_seconds;
    }

    fn is_done(&self) -> bool {
        self.remaining_seconds <= 0.0
    }
}

/// Walks an entity to a point at a fixed speed. A missing entity finishes the
/// command.
#[derive(Debug, Clone)]
pub struct MoveTo {
    entity: EntityId,
    target: Vec2,
    speed: f32,
    blocking: bool,
    done: bool,
}

impl MoveTo {
    pub fn new(entity: EntityId, target: Vec2, speed: f32) -> Self {
        Self {
            entity,
            target,
            speed,
            blocking: true,
            done: false,
        }
    }

    pub fn concurrent(mut self) -> Self {
        self.blocking = false;
        self
    }
}

impl Command for MoveTo {
    fn update(&mut self, ctx: &mut CommandContext<'_>) {
        let Some(entity) = ctx.world.get_mut(self.entity) else {
            self.done = true;
            return;
        };
        let offset = self.target - entity.position();
        let step = self.speed * ctx.dt_seconds;
        if offset.length() <= step.max(ARRIVAL_EPSILON) {
            entity.set_position(self.target);
            entity.velocity = Vec2::ZERO;
            self.done = true;
            return;
        }
        let direction = offset.normalized();
        if let Some(facing) = crate::geometry::Direction::from_vector(direction) {
            entity.facing = facing;
        }
        entity.translate(direction * step);
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }
}

/// Shows lines in the text box, one per confirm press.
#[derive(Debug, Clone)]
pub struct ShowText {
    lines: Vec<String>,
    index: usize,
    opened: bool,
    done: bool,
}

impl ShowText {
    pub fn new(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let done = lines.is_empty();
        Self {
            lines,
            index: 0,
            opened: false,
            done,
        }
    }
}

impl Command for ShowText {
    fn update(&mut self, ctx: &mut CommandContext<'_>) {
        if self.done {
            return;
        }
        if !self.opened {
            self.opened = true;
            ctx.events
                .publish(keys::SHOW_TEXT, EventPayload::Text(self.lines[0].clone()));
            return;
        }
        if !ctx.input.just_pressed(InputAction::Confirm) {
            return;
        }
        self.index += 1;
        match self.lines.get(self.index) {
            Some(line) => ctx
                .events
                .publish(keys::SHOW_TEXT, EventPayload::Text(line.clone())),
            None => {
                ctx.events.publish(keys::HIDE_TEXT, EventPayload::None);
                self.done = true;
            }
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

/// Moves the camera linearly to a position over a fixed duration.
#[derive(Debug, Clone)]
pub struct CameraPan {
    start: Option<Vec2>,
    target: Vec2,
    duration_seconds: f32,
    elapsed_seconds: f32,
}

impl CameraPan {
    pub fn new(target: Vec2, duration_seconds: f32) -> Self {
        Self {
            start: None,
            target,
            duration_seconds,
            elapsed_seconds: 0.0,
        }
    }
}

impl Command for CameraPan {
    fn update(&mut self, ctx: &mut CommandContext<'_>) {
        let start = *self.start.get_or_insert(ctx.camera.position);
        self.elapsed_seconds += ctx.dt_seconds;
        let t = if self.duration_seconds <= 0.0 {
            1.0
        } else {
            (self.elapsed_seconds / self.duration_seconds).min(1.0)
        };
        ctx.camera.position = start + (self.target - start) * t;
    }

    fn is_done(&self) -> bool {
        self.elapsed_seconds >= self.duration_seconds
    }
}

/// Black bars across the top and bottom of the screen for the length of the
/// cutscene.
#[derive(Debug, Clone)]
pub struct Letterbox {
    bar_height: i32,
    slide_seconds: f32,
    elapsed_seconds: f32,
}

impl Letterbox {
    pub fn new(bar_height: i32) -> Self {
        Self {
            bar_height,
            slide_seconds: 0.25,
            elapsed_seconds: 0.0,
        }
    }

    fn current_height(&self) -> i32 {
        if self.slide_seconds <= 0.0 {
            return self.bar_height;
        }
        let t = (self.elapsed_seconds / self.slide_seconds).min(1.0);
        (self.bar_height as f32 * t).round() as i32
    }
}

impl Command for Letterbox {
    fn update(&mut self, ctx: &mut CommandContext<'_>) {
        self.elapsed_seconds += ctx.dt_seconds;
    }

    fn is_done(&self) -> bool {
        false
    }

    fn is_blocking(&self) -> bool {
        false
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn draw(&self, renderer: &mut dyn Renderer, viewport: Viewport) {
        let height = self.current_height();
        if height <= 0 {
            return;
        }
        let width = viewport.width as i32;
        renderer.fill(Rect::new(0, 0, width, height), Rgba::BLACK);
        renderer.fill(
            Rect::new(0, viewport.height as i32 - height, width, height),
            Rgba::BLACK,
        );
    }
}

/// Publishes one event and finishes.
#[derive(Debug, Clone)]
pub struct Publish {
    key: String,
    payload: EventPayload,
    done: bool,
}

impl Publish {
    pub fn new(key: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            key: key.into(),
            payload,
            done: false,
        }
    }
}

impl Command for Publish {
    fn update(&mut self, ctx: &mut CommandContext<'_>) {
        if !self.done {
            ctx.events.publish(&self.key, self.payload.clone());
            self.done = true;
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
