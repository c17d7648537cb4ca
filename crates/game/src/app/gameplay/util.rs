fn sprite_command(entity: &Entity, camera: &Camera2D) -> DrawCommand {
    let (x, y) = world_to_screen(entity.position(), camera);
    let rect = entity.rect();
    let (scale, alpha) = match entity.effect {
        Some(VisualEffect::Dissolve { progress }) => (1.0 - progress, 1.0 - progress),
        Some(VisualEffect::Flash { remaining_seconds }) => {
            let blink = (remaining_seconds * FLASH_BLINKS_PER_SECOND) as i32 % 2 == 1;
            (1.0, if blink { 0.35 } else { 1.0 })
        }
        None => (1.0, 1.0),
    };
    DrawCommand::Sprite {
        texture: entity.texture.clone(),
        frame: entity.animation.frame,
        rect: Rect::new(x, y, rect.w, rect.h),
        rotation_radians: entity.rotation_radians,
        scale,
        alpha,
    }
}

/// Where a player who left through `exit` appears in the next room: just
/// inside the opposite edge, keeping the coordinate along the edge as far as
/// the new room's bounds allow.
fn entry_position(exit: Direction, position: Vec2, rect: Rect, bounds: Rect) -> Vec2 {
    let w = rect.w as f32;
    let h = rect.h as f32;
    let along_x = position
        .x
        .min(bounds.right() as f32 - w)
        .max(bounds.left() as f32);
    let along_y = position
        .y
        .min(bounds.bottom() as f32 - h)
        .max(bounds.top() as f32);
    match exit {
        Direction::Left => Vec2::new(bounds.right() as f32 - w - ROOM_ENTRY_INSET, along_y),
        Direction::Right => Vec2::new(bounds.left() as f32 + ROOM_ENTRY_INSET, along_y),
        Direction::Up => Vec2::new(along_x, bounds.bottom() as f32 - h - ROOM_ENTRY_INSET),
        Direction::Down => Vec2::new(along_x, bounds.top() as f32 + ROOM_ENTRY_INSET),
    }
}

fn inventory_summary(inventory: &Inventory) -> String {
    inventory
        .entries()
        .iter()
        .map(|(key, count)| format!("{key} x{count}"))
        .collect::<Vec<_>>()
        .join("  ")
}
