//! Button interaction modes

/// How a button press is turned into a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonType {
    /// True for exactly one cycle on each press
    Click,

    /// Flips state on each press
    Toggle,

    /// True while held
    Simple,
}

/// Edge tracking for a single bound button.
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonState {
    prev_pressed: bool,
    toggled: bool,
}

impl ButtonState {
    /// Feed in whether the button is held this cycle and get the resulting
    /// value for the given button type.
    ///
    /// Must be called exactly once per cycle so edges are not missed.
    pub fn update(&mut self, button_type: ButtonType, pressed: bool) -> bool {
        let rising = pressed && !self.prev_pressed;
        self.prev_pressed = pressed;

        match button_type {
            ButtonType::Click => rising,
            ButtonType::Toggle => {
                if rising {
                    self.toggled = !self.toggled;
                }
                self.toggled
            },
            ButtonType::Simple => pressed,
        }
    }

    pub fn is_toggled(&self) -> bool {
        self.toggled
    }

    /// Whether the button was held at the last update.
    pub fn is_held(&self) -> bool {
        self.prev_pressed
    }

    /// Clear the toggle without forgetting whether the button is held, so a
    /// held button doesn't register a new press.
    pub fn clear_toggle(&mut self) {
        self.toggled = false;
    }
}
