#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Call,
    Accept,
    Reject,
    HangUp,
    Chat,
    Quit,
}

const ACTION_COUNT: usize = 10;

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Call => 4,
            InputAction::Accept => 5,
            InputAction::Reject => 6,
            InputAction::HangUp => 7,
            InputAction::Chat => 8,
            InputAction::Quit => 9,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            InputAction::MoveUp => Some(Direction::Up),
            InputAction::MoveDown => Some(Direction::Down),
            InputAction::MoveLeft => Some(Direction::Left),
            InputAction::MoveRight => Some(Direction::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

/// Movement keys currently held, most recently pressed first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldDirections {
    held: Vec<Direction>,
}

impl HeldDirections {
    pub fn press(&mut self, direction: Direction) {
        if !self.held.contains(&direction) {
            self.held.insert(0, direction);
        }
    }

    pub fn release(&mut self, direction: Direction) {
        self.held.retain(|held| *held != direction);
    }

    pub fn direction(&self) -> Option<Direction> {
        self.held.first().copied()
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}

/// Input state for one fixed tick. Presses are edge-triggered and only
/// appear in the first snapshot after the key goes down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    quit_requested: bool,
    direction: Option<Direction>,
    actions: ActionStates,
    pressed: ActionStates,
    typed_text: String,
    backspaces: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        direction: Option<Direction>,
        actions: ActionStates,
        pressed: ActionStates,
        typed_text: String,
        backspaces: u32,
    ) -> Self {
        Self {
            quit_requested,
            direction,
            actions,
            pressed,
            typed_text,
            backspaces,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    pub fn typed_text(&self) -> &str {
        &self.typed_text
    }

    pub fn backspaces(&self) -> u32 {
        self.backspaces
    }

    pub fn with_direction(mut self, direction: Option<Direction>) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_pressed(mut self, action: InputAction) -> Self {
        self.actions.set(action, true);
        self.pressed.set(action, true);
        self
    }

    pub fn with_typed_text(mut self, text: &str) -> Self {
        self.typed_text.push_str(text);
        self
    }

    pub fn with_backspaces(mut self, count: u32) -> Self {
        self.backspaces = count;
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }
}
