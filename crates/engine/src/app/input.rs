use crate::geometry::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Attack,
    Use,
    Confirm,
    Cancel,
    Debug,
    Quit,
}

impl InputAction {
    pub const ALL: [InputAction; 10] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Attack,
        InputAction::Use,
        InputAction::Confirm,
        InputAction::Cancel,
        InputAction::Debug,
        InputAction::Quit,
    ];

    const fn index(self) -> u16 {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Attack => 4,
            InputAction::Use => 5,
            InputAction::Confirm => 6,
            InputAction::Cancel => 7,
            InputAction::Debug => 8,
            InputAction::Quit => 9,
        }
    }

    pub const fn bit(self) -> u16 {
        1 << self.index()
    }
}

pub fn action_mask(actions: &[InputAction]) -> u16 {
    actions.iter().fold(0, |mask, action| mask | action.bit())
}

/// Held / just-pressed / just-released bitmasks for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionStates {
    held: u16,
    pressed: u16,
    released: u16,
}

impl ActionStates {
    pub fn from_masks(previous_held: u16, held: u16) -> Self {
        Self {
            held,
            pressed: held & !previous_held,
            released: previous_held & !held,
        }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.held & action.bit() != 0
    }

    pub fn just_pressed(&self, action: InputAction) -> bool {
        self.pressed & action.bit() != 0
    }

    pub fn just_released(&self, action: InputAction) -> bool {
        self.released & action.bit() != 0
    }

    pub fn held_mask(&self) -> u16 {
        self.held
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    actions: ActionStates,
    quit_requested: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_states(actions: ActionStates) -> Self {
        Self {
            actions,
            quit_requested: actions.is_down(InputAction::Quit),
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn just_pressed(&self, action: InputAction) -> bool {
        self.actions.just_pressed(action)
    }

    pub fn just_released(&self, action: InputAction) -> bool {
        self.actions.just_released(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        let previous = self.actions.held;
        let held = if is_down {
            previous | action.bit()
        } else {
            previous & !action.bit()
        };
        self.actions.held = held;
        self
    }

    /// Marks `action` as held and pressed this frame.
    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.held |= action.bit();
        self.actions.pressed |= action.bit();
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    /// Raw movement intent from the four movement actions, not normalized.
    pub fn movement_vector(&self) -> Vec2 {
        let mut vector = Vec2::ZERO;
        if self.is_down(InputAction::MoveUp) {
            vector.y -= 1.0;
        }
        if self.is_down(InputAction::MoveDown) {
            vector.y += 1.0;
        }
        if self.is_down(InputAction::MoveLeft) {
            vector.x -= 1.0;
        }
        if self.is_down(InputAction::MoveRight) {
            vector.x += 1.0;
        }
        vector
    }
}

/// Turns per-frame held masks into debounced snapshots.
#[derive(Debug, Default)]
pub struct InputTracker {
    previous_held: u16,
}

impl InputTracker {
    pub fn next_mask(&mut self, held: u16) -> InputSnapshot {
        let states = ActionStates::from_masks(self.previous_held, held);
        self.previous_held = held;
        InputSnapshot::from_states(states)
    }

    pub fn next(&mut self, held: &[InputAction]) -> InputSnapshot {
        self.next_mask(action_mask(held))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_reports_press_hold_and_release_edges() {
        let mut tracker = InputTracker::default();

        let first = tracker.next(&[InputAction::Confirm]);
        assert!(first.just_pressed(InputAction::Confirm));
        assert!(first.is_down(InputAction::Confirm));

        let second = tracker.next(&[InputAction::Confirm]);
        assert!(!second.just_pressed(InputAction::Confirm));
        assert!(second.is_down(InputAction::Confirm));

        let third = tracker.next(&[]);
        assert!(third.just_released(InputAction::Confirm));
        assert!(!third.is_down(InputAction::Confirm));
    }

    #[test]
    fn quit_action_sets_quit_requested() {
        let mut tracker = InputTracker::default();
        assert!(tracker.next(&[InputAction::Quit]).quit_requested());
        assert!(!tracker.next(&[]).quit_requested());
    }

    #[test]
    fn movement_vector_combines_axes() {
        let snapshot = InputSnapshot::empty()
            .with_action_down(InputAction::MoveUp, true)
            .with_action_down(InputAction::MoveRight, true);
        assert_eq!(snapshot.movement_vector(), Vec2::new(1.0, -1.0));

        let cancelled = snapshot.with_action_down(InputAction::MoveLeft, true);
        assert_eq!(cancelled.movement_vector(), Vec2::new(0.0, -1.0));
    }
}
