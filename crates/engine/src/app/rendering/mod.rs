mod renderer;
mod transform;

pub use renderer::{DrawCommand, RecordingRenderer, Renderer, Rgba};
pub use transform::{world_to_screen, Camera2D, Viewport};
