//! Controller input.
//!
//! The console has no shift-register protocol: after every serviced refresh the whole
//! button state is written to $8005 as one byte (bit 0 A, 1 B, 2 Up, 3 Right, 4 Down,
//! 5 Left, 7 Start/Select).

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Up,
    Right,
    Down,
    Left,
    Select,
    Start,
}

impl Button {
    /// Bit in the input snapshot. Select and Start share bit 7.
    pub fn mask(self) -> u8 {
        match self {
            Button::A => 1 << 0,
            Button::B => 1 << 1,
            Button::Up => 1 << 2,
            Button::Right => 1 << 3,
            Button::Down => 1 << 4,
            Button::Left => 1 << 5,
            Button::Select | Button::Start => 1 << 7,
        }
    }
}

/// A single controller.
#[derive(Default)]
pub struct Controller {
    /// Current button states, laid out as the input register byte.
    pub state: u8,
}

impl Controller {
    /// Create a new controller with no buttons pressed.
    pub fn new() -> Self {
        Controller { state: 0 }
    }

    /// Select and Start share a bit, so releasing either clears it.
    pub fn set(&mut self, button: Button, down: bool) {
        if down {
            self.state |= button.mask();
        } else {
            self.state &= !button.mask();
        }
    }

    pub fn release_all(&mut self) {
        self.state = 0;
    }

    /// Byte written to the input register.
    pub fn snapshot(&self) -> u8 {
        self.state
    }
}
