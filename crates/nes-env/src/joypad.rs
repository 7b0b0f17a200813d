//! Joypad input bitmask.

use bitflags::bitflags;

bitflags! {
    /// One frame's worth of controller input.
    ///
    /// Bit positions match the controller's serial shift order (A is
    /// reported first). Raw bytes from looser callers go through
    /// [`JoypadButtons::from_bits_truncate`], which silently masks any
    /// bits the controller does not have.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct JoypadButtons: u8 {
        const A      = 0x01;
        const B      = 0x02;
        const SELECT = 0x04;
        const START  = 0x08;
        const UP     = 0x10;
        const DOWN   = 0x20;
        const LEFT   = 0x40;
        const RIGHT  = 0x80;
    }
}

impl JoypadButtons {
    /// Look up a single button by name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "SELECT" => Some(Self::SELECT),
            "START" => Some(Self::START),
            "UP" => Some(Self::UP),
            "DOWN" => Some(Self::DOWN),
            "LEFT" => Some(Self::LEFT),
            "RIGHT" => Some(Self::RIGHT),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        assert_eq!(JoypadButtons::from_name("a"), Some(JoypadButtons::A));
        assert_eq!(JoypadButtons::from_name("Right"), Some(JoypadButtons::RIGHT));
        assert_eq!(JoypadButtons::from_name("turbo"), None);
    }

    #[test]
    fn raw_bytes_mask_cleanly() {
        // Every u8 is a valid bitmask for an 8-button pad; the point of
        // from_bits_truncate is that callers never get an error path.
        let all = JoypadButtons::from_bits_truncate(0xFF);
        assert_eq!(all, JoypadButtons::all());
    }
}
