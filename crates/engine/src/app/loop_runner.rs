use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::content::ContentError;
use crate::dungeon::DungeonError;
use crate::tilemap::TilemapError;
use crate::StartupError;

use super::input::InputTracker;
use super::rendering::Renderer;
use super::runtime::Runtime;

pub const FRAMES_ENV_VAR: &str = "RPG_DEMO_FRAMES";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    /// Stop after this many presented frames.
    pub max_frames: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            max_frames: None,
        }
    }
}

impl LoopConfig {
    /// Applies `RPG_DEMO_FRAMES` when set. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        match env::var(FRAMES_ENV_VAR) {
            Ok(value) => match value.parse::<u64>() {
                Ok(frames) => self.max_frames = Some(frames),
                Err(_) => warn!(
                    env_var = FRAMES_ENV_VAR,
                    value = value.as_str(),
                    "invalid frame-limit env var value; ignoring"
                ),
            },
            Err(env::VarError::NotPresent) => {}
            Err(error) => warn!(
                env_var = FRAMES_ENV_VAR,
                error = %error,
                "unable to read frame-limit env var; ignoring"
            ),
        }
        self
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct PlatformError {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load content: {0}")]
    Content(#[from] ContentError),
    #[error("invalid tilemap: {0}")]
    Tilemap(#[from] TilemapError),
    #[error("invalid dungeon layout: {0}")]
    Dungeon(#[from] DungeonError),
    #[error("platform failed: {0}")]
    Platform(#[from] PlatformError),
}

/// Window, input device and presentation surface the loop drives.
pub trait Platform {
    /// Wall time since the previous frame, or `None` once the platform closed.
    fn next_frame(&mut self) -> Option<Duration>;
    /// Logical actions currently held, as an [`super::input::action_mask`].
    fn held_actions(&mut self) -> u16;
    fn renderer(&mut self) -> &mut dyn Renderer;
    fn present(&mut self) -> Result<(), PlatformError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub ticks: u64,
    pub clamped_frames: u64,
}

/// Accumulates frame time into fixed simulation steps.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    accumulator: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    pub dropped_backlog: Duration,
}

impl FixedStepClock {
    pub fn new(config: &LoopConfig) -> Self {
        let target_tps = config.target_tps.max(1);
        Self {
            fixed_dt: Duration::from_secs_f64(1.0 / target_tps as f64),
            max_frame_delta: normalize_non_zero_duration(
                config.max_frame_delta,
                Duration::from_millis(250),
            ),
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            accumulator: Duration::ZERO,
        }
    }

    pub fn fixed_dt_seconds(&self) -> f32 {
        self.fixed_dt.as_secs_f32()
    }

    pub fn advance(&mut self, frame_dt: Duration) -> StepPlan {
        let clamped = frame_dt.min(self.max_frame_delta);
        let accumulator = self.accumulator.saturating_add(clamped);
        let (plan, remaining) = plan_sim_steps(accumulator, self.fixed_dt, self.max_ticks_per_frame);
        self.accumulator = remaining;
        plan
    }
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> (StepPlan, Duration) {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        (
            StepPlan {
                ticks_to_run,
                dropped_backlog: accumulator,
            },
            Duration::ZERO,
        )
    } else {
        (
            StepPlan {
                ticks_to_run,
                dropped_backlog: Duration::ZERO,
            },
            accumulator,
        )
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

/// Runs frames until the platform closes, the quit action is held, or the
/// frame limit is reached. Scenes are torn down before returning.
pub fn run_app(
    config: &LoopConfig,
    runtime: &mut Runtime,
    platform: &mut dyn Platform,
) -> Result<LoopSummary, AppError> {
    let mut clock = FixedStepClock::new(config);
    let fixed_dt_seconds = clock.fixed_dt_seconds();
    let mut tracker = InputTracker::default();
    let mut summary = LoopSummary::default();
    info!(
        target_tps = config.target_tps.max(1),
        max_frame_delta_ms = config.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame = config.max_ticks_per_frame.max(1),
        max_frames = ?config.max_frames,
        "loop_config"
    );

    let result = 'frames: loop {
        if config
            .max_frames
            .is_some_and(|max_frames| summary.frames >= max_frames)
        {
            info!(reason = "frame_limit", "shutdown_requested");
            break 'frames Ok(());
        }
        let Some(frame_dt) = platform.next_frame() else {
            info!(reason = "platform_closed", "shutdown_requested");
            break 'frames Ok(());
        };

        let plan = clock.advance(frame_dt);
        for _ in 0..plan.ticks_to_run {
            let input = tracker.next_mask(platform.held_actions());
            if input.quit_requested() {
                info!(reason = "quit_action", "shutdown_requested");
                break 'frames Ok(());
            }
            runtime.tick(fixed_dt_seconds, &input);
            summary.ticks += 1;
        }
        if plan.dropped_backlog > Duration::ZERO {
            summary.clamped_frames += 1;
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                "sim_clamp_triggered"
            );
        }

        runtime.draw(platform.renderer());
        if let Err(error) = platform.present() {
            break 'frames Err(error);
        }
        summary.frames += 1;
    };

    runtime.shutdown();
    info!(frames = summary.frames, ticks = summary.ticks, "shutdown");
    result?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{action_mask, InputAction, RecordingRenderer};
    use crate::content::AssetRegistry;

    struct ScriptedPlatform {
        frames: Vec<u16>,
        cursor: usize,
        renderer: RecordingRenderer,
        presented: usize,
    }

    impl ScriptedPlatform {
        fn new(frames: Vec<u16>) -> Self {
            Self {
                frames,
                cursor: 0,
                renderer: RecordingRenderer::default(),
                presented: 0,
            }
        }
    }

    impl Platform for ScriptedPlatform {
        fn next_frame(&mut self) -> Option<Duration> {
            if self.cursor >= self.frames.len() {
                return None;
            }
            self.cursor += 1;
            Some(Duration::from_millis(20))
        }

        fn held_actions(&mut self) -> u16 {
            self.frames[self.cursor - 1]
        }

        fn renderer(&mut self) -> &mut dyn Renderer {
            &mut self.renderer
        }

        fn present(&mut self) -> Result<(), PlatformError> {
            self.presented += 1;
            Ok(())
        }
    }

    #[test]
    fn plan_runs_expected_ticks_without_drop() {
        let (plan, remaining) = plan_sim_steps(Duration::from_millis(48), Duration::from_millis(16), 5);
        assert_eq!(plan.ticks_to_run, 3);
        assert_eq!(plan.dropped_backlog, Duration::ZERO);
        assert_eq!(remaining, Duration::ZERO);
    }

    #[test]
    fn plan_drops_backlog_when_tick_cap_hit() {
        let (plan, remaining) = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);
        assert_eq!(plan.ticks_to_run, 3);
        assert_eq!(plan.dropped_backlog, Duration::from_millis(72));
        assert_eq!(remaining, Duration::ZERO);
    }

    #[test]
    fn clock_clamps_large_frames() {
        let config = LoopConfig {
            target_tps: 10,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 10,
            max_frames: None,
        };
        let mut clock = FixedStepClock::new(&config);
        assert_eq!(clock.advance(Duration::from_secs(3)).ticks_to_run, 2);
        assert_eq!(clock.advance(Duration::from_millis(50)).ticks_to_run, 1);
    }

    #[test]
    fn loop_stops_at_frame_limit() {
        let mut runtime = Runtime::new(Box::new(AssetRegistry::new()));
        let mut platform = ScriptedPlatform::new(vec![0; 10]);
        let config = LoopConfig {
            max_frames: Some(4),
            ..LoopConfig::default()
        };

        let summary = run_app(&config, &mut runtime, &mut platform).expect("run");
        assert_eq!(summary.frames, 4);
        assert_eq!(platform.presented, 4);
        assert_eq!(runtime.ticks(), summary.ticks);
    }

    #[test]
    fn quit_action_ends_the_loop() {
        let mut runtime = Runtime::new(Box::new(AssetRegistry::new()));
        let quit = action_mask(&[InputAction::Quit]);
        let mut platform = ScriptedPlatform::new(vec![0, 0, quit, 0]);

        let summary = run_app(&LoopConfig::default(), &mut runtime, &mut platform).expect("run");
        assert_eq!(summary.frames, 2);
    }
}
