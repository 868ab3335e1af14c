//! Standard controller shift-register readout.
//!
//! $4016 bit 0 is the strobe for both ports. Raising it latches the
//! eight buttons into a shift register; while it stays high, serial
//! reads report the A button without shifting. After the strobe drops,
//! each read of $4016/$4017 returns one bit in controller order and
//! advances; the ninth and later reads return 1.

/// One of the eight pad buttons, in shift-out order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    /// Bit position in the latched byte.
    pub const fn bit(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::Select => 2,
            Self::Start => 3,
            Self::Up => 4,
            Self::Down => 5,
            Self::Left => 6,
            Self::Right => 7,
        }
    }
}

/// One controller port.
pub struct ControllerPort {
    /// Live button state, one bit per `Button`.
    buttons: u8,
    /// Strobe level last written to $4016.
    strobe: bool,
    /// Button byte captured when the strobe rose.
    latched: u8,
    /// Next bit to shift out, 0..8.
    shift_index: u8,
}

impl ControllerPort {
    pub fn new() -> Self {
        Self {
            buttons: 0,
            strobe: false,
            latched: 0,
            shift_index: 0,
        }
    }

    /// Record a press or release. Visible at the next latch.
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.buttons |= 1 << button.bit();
        } else {
            self.buttons &= !(1 << button.bit());
        }
    }

    /// Current live button byte.
    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    /// $4016 write, bit 0. Raising the strobe latches and rewinds.
    pub fn set_strobe(&mut self, level: bool) {
        self.strobe = level;
        if level {
            self.latched = self.buttons;
            self.shift_index = 0;
        }
    }

    /// Serial read of $4016/$4017 bit 0.
    pub fn read_serial(&mut self) -> u8 {
        if self.strobe {
            // Held high: the shifter keeps reloading, so reads see A.
            return self.latched & 1;
        }
        if self.shift_index >= 8 {
            return 1;
        }
        let bit = (self.latched >> self.shift_index) & 1;
        self.shift_index += 1;
        bit
    }
}

impl Default for ControllerPort {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latched_bits_shift_out_in_order() {
        let mut port = ControllerPort::new();
        port.set_button(Button::A, true);
        port.set_button(Button::Start, true);

        port.set_strobe(true);
        port.set_strobe(false);

        let bits: Vec<u8> = (0..8).map(|_| port.read_serial()).collect();
        assert_eq!(bits, [1, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn ninth_read_returns_one() {
        let mut port = ControllerPort::new();
        port.set_strobe(true);
        port.set_strobe(false);
        for _ in 0..8 {
            assert_eq!(port.read_serial(), 0);
        }
        assert_eq!(port.read_serial(), 1);
        assert_eq!(port.read_serial(), 1);
    }

    #[test]
    fn reads_during_strobe_return_a_without_advancing() {
        let mut port = ControllerPort::new();
        port.set_button(Button::A, true);
        port.set_button(Button::B, true);
        port.set_strobe(true);
        assert_eq!(port.read_serial(), 1);
        assert_eq!(port.read_serial(), 1);
        port.set_strobe(false);
        // Index did not move: first post-strobe read is still A.
        assert_eq!(port.read_serial(), 1);
        assert_eq!(port.read_serial(), 1); // B
        assert_eq!(port.read_serial(), 0); // Select
    }

    #[test]
    fn presses_after_latch_wait_for_the_next_strobe() {
        let mut port = ControllerPort::new();
        port.set_strobe(true);
        port.set_strobe(false);
        port.set_button(Button::A, true);
        assert_eq!(port.read_serial(), 0);
        port.set_strobe(true);
        port.set_strobe(false);
        assert_eq!(port.read_serial(), 1);
    }
}
