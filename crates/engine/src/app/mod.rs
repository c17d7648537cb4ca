mod input;
mod loop_runner;
mod rendering;
mod runtime;
mod scene;

pub use input::{action_mask, ActionStates, InputAction, InputSnapshot, InputTracker};
pub use loop_runner::{
    run_app, AppError, FixedStepClock, LoopConfig, LoopSummary, Platform, PlatformError, StepPlan,
    FRAMES_ENV_VAR,
};
pub use rendering::{
    world_to_screen, Camera2D, DrawCommand, RecordingRenderer, Renderer, Rgba, Viewport,
};
pub use runtime::Runtime;
pub use scene::{
    Scene, SceneContext, SceneFactory, SceneManager, SceneRequest, SceneRequests,
};
