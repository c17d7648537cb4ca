use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    pub const WHITE: Rgba = Rgba(255, 255, 255, 255);
    pub const BLACK: Rgba = Rgba(0, 0, 0, 255);
    pub const RED: Rgba = Rgba(200, 40, 40, 255);
}

/// Screen-space draw call. Rects are already camera-relative.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Tile {
        layer: usize,
        tile: u16,
        rect: Rect,
    },
    Sprite {
        texture: String,
        frame: usize,
        rect: Rect,
        rotation_radians: f32,
        scale: f32,
        alpha: f32,
    },
    Fill {
        rect: Rect,
        color: Rgba,
    },
    Text {
        text: String,
        x: i32,
        y: i32,
    },
}

pub trait Renderer {
    fn submit(&mut self, command: DrawCommand);

    fn fill(&mut self, rect: Rect, color: Rgba) {
        self.submit(DrawCommand::Fill { rect, color });
    }

    fn text(&mut self, text: &str, x: i32, y: i32) {
        self.submit(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
        });
    }
}

/// Keeps every submitted command; used by the headless runner and tests.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    commands: Vec<DrawCommand>,
}

impl RecordingRenderer {
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn sprite_textures(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Sprite { texture, .. } => Some(texture.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn submit(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}
