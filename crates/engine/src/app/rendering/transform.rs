use crate::geometry::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Top-left anchored camera in world pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
}

impl Camera2D {
    /// Centers the camera on `target`, then clamps it so the viewport stays
    /// inside `bounds` when the room is larger than the screen.
    pub fn follow(&mut self, target: Vec2, viewport: Viewport, bounds: Rect) {
        let half_w = viewport.width as f32 * 0.5;
        let half_h = viewport.height as f32 * 0.5;
        let mut position = Vec2::new(target.x - half_w, target.y - half_h);

        let max_x = (bounds.right() - viewport.width as i32).max(bounds.left()) as f32;
        let max_y = (bounds.bottom() - viewport.height as i32).max(bounds.top()) as f32;
        position.x = position.x.clamp(bounds.left() as f32, max_x);
        position.y = position.y.clamp(bounds.top() as f32, max_y);
        self.position = position;
    }

    pub fn visible_rect(&self, viewport: Viewport) -> Rect {
        Rect::new(
            self.position.x.floor() as i32,
            self.position.y.floor() as i32,
            viewport.width as i32,
            viewport.height as i32,
        )
    }
}

pub fn world_to_screen(world: Vec2, camera: &Camera2D) -> (i32, i32) {
    let x = world.x - camera.position.x;
    let y = world.y - camera.position.y;
    (x.round() as i32, y.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 160,
        height: 128,
    };

    #[test]
    fn camera_offset_shifts_screen_position() {
        let camera = Camera2D {
            position: Vec2::new(10.0, -5.0),
        };
        assert_eq!(world_to_screen(Vec2::new(12.0, -4.0), &camera), (2, 1));
    }

    #[test]
    fn follow_clamps_to_room_bounds() {
        let bounds = Rect::new(0, 0, 320, 256);
        let mut camera = Camera2D::default();

        camera.follow(Vec2::new(8.0, 8.0), VIEWPORT, bounds);
        assert_eq!(camera.position, Vec2::ZERO);

        camera.follow(Vec2::new(200.0, 100.0), VIEWPORT, bounds);
        assert_eq!(camera.position, Vec2::new(120.0, 36.0));

        camera.follow(Vec2::new(1000.0, 1000.0), VIEWPORT, bounds);
        assert_eq!(camera.position, Vec2::new(160.0, 128.0));
    }

    #[test]
    fn follow_pins_small_rooms_to_origin() {
        let mut camera = Camera2D::default();
        camera.follow(Vec2::new(50.0, 50.0), VIEWPORT, Rect::new(0, 0, 64, 64));
        assert_eq!(camera.position, Vec2::ZERO);
    }
}
