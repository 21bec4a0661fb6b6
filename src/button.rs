//! Power key debounce.
//!
//! The PMIC only reports a press edge (IRQ3 short/long press), never a level. The
//! debouncer turns each edge into a held window of N service ticks so consumers get a
//! clean press/release pair.

/// Debounce state.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonState {
    Idle,
    /// Ticks left before the release is reported.
    Held { remaining: u8 },
}

/// Logical transition to publish.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

#[derive(Clone, Copy, Debug)]
pub struct Debouncer {
    state: ButtonState,
    hold_ticks: u8,
}

impl Debouncer {
    /// A hold of zero ticks is stretched to one so every press gets a release.
    pub fn new(hold_ticks: u8) -> Self {
        Self {
            state: ButtonState::Idle,
            hold_ticks: hold_ticks.max(1),
        }
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn hold_ticks(&self) -> u8 {
        self.hold_ticks
    }

    pub fn is_held(&self) -> bool {
        matches!(self.state, ButtonState::Held { .. })
    }

    /// Register a press edge. Re-arms the window if already held, without a second
    /// `Pressed` edge.
    pub fn press(&mut self) -> Option<ButtonEdge> {
        let was_idle = self.state == ButtonState::Idle;
        self.state = ButtonState::Held {
            remaining: self.hold_ticks,
        };
        was_idle.then_some(ButtonEdge::Pressed)
    }

    /// Advance one service tick without a new press.
    pub fn tick(&mut self) -> Option<ButtonEdge> {
        match self.state {
            ButtonState::Idle => None,
            ButtonState::Held { remaining } if remaining <= 1 => {
                self.state = ButtonState::Idle;
                Some(ButtonEdge::Released)
            }
            ButtonState::Held { remaining } => {
                self.state = ButtonState::Held {
                    remaining: remaining - 1,
                };
                None
            }
        }
    }
}
