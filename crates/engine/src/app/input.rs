use super::PixelPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
}

const ACTION_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
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

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
        }
    }
}

/// Keys the gameplay layer distinguishes. Everything else is `Other`
/// and is only interesting for the text it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Enter,
    Backspace,
    Escape,
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    F5,
    F6,
    Other,
}

/// Discrete input, queued in arrival order and drained once per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key {
        key: KeyPress,
        text: Option<String>,
        repeat: bool,
    },
    Click {
        position_px: PixelPos,
    },
}

impl InputEvent {
    pub fn key(key: KeyPress) -> Self {
        InputEvent::Key {
            key,
            text: None,
            repeat: false,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        let key = if text == " " {
            KeyPress::Space
        } else {
            KeyPress::Other
        };
        InputEvent::Key {
            key,
            text: Some(text),
            repeat: false,
        }
    }

    pub fn click(x: i32, y: i32) -> Self {
        InputEvent::Click {
            position_px: PixelPos { x, y },
        }
    }
}
