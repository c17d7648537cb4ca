use std::time::Duration;

use engine::app::{action_mask, PlatformError, RecordingRenderer};
use engine::{InputAction, Platform, Renderer};
use tracing::trace;

/// Platform without a window: replays a scripted sequence of held-action
/// masks at a fixed frame rate and records draw calls.
pub(crate) struct HeadlessPlatform {
    script: Vec<u16>,
    cursor: usize,
    frame_duration: Duration,
    renderer: RecordingRenderer,
}

impl HeadlessPlatform {
    pub(crate) fn new(script: Vec<u16>, target_tps: u32) -> Self {
        Self {
            script,
            cursor: 0,
            frame_duration: Duration::from_secs_f64(1.0 / target_tps.max(1) as f64),
            renderer: RecordingRenderer::default(),
        }
    }
}

impl Platform for HeadlessPlatform {
    fn next_frame(&mut self) -> Option<Duration> {
        if self.cursor >= self.script.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.frame_duration)
    }

    fn held_actions(&mut self) -> u16 {
        self.cursor
            .checked_sub(1)
            .and_then(|index| self.script.get(index))
            .copied()
            .unwrap_or(0)
    }

    fn renderer(&mut self) -> &mut dyn Renderer {
        &mut self.renderer
    }

    fn present(&mut self) -> Result<(), PlatformError> {
        trace!(
            frame = self.cursor,
            commands = self.renderer.commands().len(),
            "frame_presented"
        );
        self.renderer.clear();
        Ok(())
    }
}

fn hold(script: &mut Vec<u16>, actions: &[InputAction], frames: usize) {
    let mask = action_mask(actions);
    script.extend(std::iter::repeat(mask).take(frames));
}

fn tap(script: &mut Vec<u16>, action: InputAction) {
    hold(script, &[action], 1);
    hold(script, &[], 6);
}

/// Walks through the intro, talks to the elder, opens the hub chest and
/// heads north.
pub(crate) fn demo_script() -> Vec<u16> {
    let mut script = Vec::new();
    hold(&mut script, &[], 60);
    for _ in 0..4 {
        tap(&mut script, InputAction::Confirm);
        hold(&mut script, &[], 20);
    }
    hold(&mut script, &[], 90);

    hold(&mut script, &[InputAction::MoveUp, InputAction::MoveLeft], 70);
    for _ in 0..3 {
        tap(&mut script, InputAction::Confirm);
        hold(&mut script, &[], 20);
    }

    hold(&mut script, &[InputAction::MoveRight], 120);
    tap(&mut script, InputAction::Confirm);
    hold(&mut script, &[], 30);

    hold(&mut script, &[InputAction::MoveLeft], 50);
    hold(&mut script, &[InputAction::MoveUp], 150);
    for _ in 0..6 {
        tap(&mut script, InputAction::Attack);
        hold(&mut script, &[InputAction::MoveDown], 10);
    }
    hold(&mut script, &[], 60);
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_script_then_closes() {
        let up = action_mask(&[InputAction::MoveUp]);
        let mut platform = HeadlessPlatform::new(vec![0, up], 60);

        assert!(platform.next_frame().is_some());
        assert_eq!(platform.held_actions(), 0);
        assert!(platform.next_frame().is_some());
        assert_eq!(platform.held_actions(), up);
        assert!(platform.next_frame().is_none());
    }

    #[test]
    fn present_clears_recorded_commands() {
        let mut platform = HeadlessPlatform::new(vec![0], 60);
        platform.renderer().text("hello", 0, 0);
        platform.present().expect("present");
        assert!(platform.renderer.commands().is_empty());
    }

    #[test]
    fn demo_script_never_requests_quit() {
        let quit = action_mask(&[InputAction::Quit]);
        assert!(demo_script().iter().all(|mask| mask & quit == 0));
    }
}
