pub const KEY_COUNT: usize = 16;

/// The 16-key hex keypad. Written by the host before each cycle, read by
/// the CPU.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keyboard {
    keys: [bool; KEY_COUNT],
}

impl Keyboard {
    /// Press `key`. Only the low nibble is used.
    pub fn key_down(&mut self, key: u8) {
        self.keys[(key & 0xF) as usize] = true;
    }

    pub fn key_up(&mut self, key: u8) {
        self.keys[(key & 0xF) as usize] = false;
    }

    /// Release every key.
    pub fn clear(&mut self) {
        self.keys = [false; KEY_COUNT];
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0xF) as usize]
    }

    /// Lowest-numbered key currently held, if any.
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|&down| down).map(|key| key as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release() {
        let mut keyboard = Keyboard::default();
        assert_eq!(keyboard.first_pressed(), None);

        keyboard.key_down(0xB);
        keyboard.key_down(0x4);
        assert!(keyboard.is_pressed(0xB));
        assert_eq!(keyboard.first_pressed(), Some(0x4));

        keyboard.key_up(0x4);
        assert_eq!(keyboard.first_pressed(), Some(0xB));

        keyboard.clear();
        assert!(!keyboard.is_pressed(0xB));
    }

    #[test]
    fn high_nibble_is_ignored() {
        let mut keyboard = Keyboard::default();
        keyboard.key_down(0x1A);
        assert!(keyboard.is_pressed(0xA));
        assert!(keyboard.is_pressed(0xFA));
    }
}
