//! Integer key and mouse button codes accepted by the C ABI.
//!
//! The numbering is GLFW's: printable keys use their ASCII code, named keys
//! start at 256, mouse buttons count from 0 (left, right, middle).

use winit::event::MouseButton;
use winit::keyboard::KeyCode;

const LETTERS: [KeyCode; 26] = [
    KeyCode::KeyA,
    KeyCode::KeyB,
    KeyCode::KeyC,
    KeyCode::KeyD,
    KeyCode::KeyE,
    KeyCode::KeyF,
    KeyCode::KeyG,
    KeyCode::KeyH,
    KeyCode::KeyI,
    KeyCode::KeyJ,
    KeyCode::KeyK,
    KeyCode::KeyL,
    KeyCode::KeyM,
    KeyCode::KeyN,
    KeyCode::KeyO,
    KeyCode::KeyP,
    KeyCode::KeyQ,
    KeyCode::KeyR,
    KeyCode::KeyS,
    KeyCode::KeyT,
    KeyCode::KeyU,
    KeyCode::KeyV,
    KeyCode::KeyW,
    KeyCode::KeyX,
    KeyCode::KeyY,
    KeyCode::KeyZ,
];

const DIGITS: [KeyCode; 10] = [
    KeyCode::Digit0,
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

const FUNCTION_KEYS: [KeyCode; 12] = [
    KeyCode::F1,
    KeyCode::F2,
    KeyCode::F3,
    KeyCode::F4,
    KeyCode::F5,
    KeyCode::F6,
    KeyCode::F7,
    KeyCode::F8,
    KeyCode::F9,
    KeyCode::F10,
    KeyCode::F11,
    KeyCode::F12,
];

/// Physical key for a C key code, or `None` for codes without a mapping.
pub fn key_from_code(code: i32) -> Option<KeyCode> {
    let index = |base: i32| usize::try_from(code - base).ok();
    let key = match code {
        32 => KeyCode::Space,
        39 => KeyCode::Quote,
        44 => KeyCode::Comma,
        45 => KeyCode::Minus,
        46 => KeyCode::Period,
        47 => KeyCode::Slash,
        48..=57 => DIGITS[index(48)?],
        59 => KeyCode::Semicolon,
        61 => KeyCode::Equal,
        65..=90 => LETTERS[index(65)?],
        91 => KeyCode::BracketLeft,
        92 => KeyCode::Backslash,
        93 => KeyCode::BracketRight,
        96 => KeyCode::Backquote,
        256 => KeyCode::Escape,
        257 => KeyCode::Enter,
        258 => KeyCode::Tab,
        259 => KeyCode::Backspace,
        260 => KeyCode::Insert,
        261 => KeyCode::Delete,
        262 => KeyCode::ArrowRight,
        263 => KeyCode::ArrowLeft,
        264 => KeyCode::ArrowDown,
        265 => KeyCode::ArrowUp,
        266 => KeyCode::PageUp,
        267 => KeyCode::PageDown,
        268 => KeyCode::Home,
        269 => KeyCode::End,
        290..=301 => FUNCTION_KEYS[index(290)?],
        340 => KeyCode::ShiftLeft,
        341 => KeyCode::ControlLeft,
        342 => KeyCode::AltLeft,
        344 => KeyCode::ShiftRight,
        345 => KeyCode::ControlRight,
        346 => KeyCode::AltRight,
        _ => return None,
    };
    Some(key)
}

/// Mouse button for a C button code.
pub fn mouse_button_from_code(code: i32) -> Option<MouseButton> {
    match code {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Right),
        2 => Some(MouseButton::Middle),
        3 => Some(MouseButton::Back),
        4 => Some(MouseButton::Forward),
        5..=7 => u16::try_from(code).ok().map(MouseButton::Other),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_keys_use_ascii_codes() {
        assert_eq!(key_from_code(i32::from(b'A')), Some(KeyCode::KeyA));
        assert_eq!(key_from_code(i32::from(b'C')), Some(KeyCode::KeyC));
        assert_eq!(key_from_code(i32::from(b'Z')), Some(KeyCode::KeyZ));
        assert_eq!(key_from_code(i32::from(b'0')), Some(KeyCode::Digit0));
        assert_eq!(key_from_code(i32::from(b'9')), Some(KeyCode::Digit9));
        assert_eq!(key_from_code(32), Some(KeyCode::Space));
    }

    #[test]
    fn named_keys() {
        assert_eq!(key_from_code(256), Some(KeyCode::Escape));
        assert_eq!(key_from_code(265), Some(KeyCode::ArrowUp));
        assert_eq!(key_from_code(290), Some(KeyCode::F1));
        assert_eq!(key_from_code(301), Some(KeyCode::F12));
        assert_eq!(key_from_code(342), Some(KeyCode::AltLeft));
    }

    #[test]
    fn unmapped_codes_are_none() {
        for code in [-1, 0, 97, 255, 302, 343, 1000] {
            assert_eq!(key_from_code(code), None, "code {code}");
        }
    }

    #[test]
    fn mouse_buttons() {
        assert_eq!(mouse_button_from_code(0), Some(MouseButton::Left));
        assert_eq!(mouse_button_from_code(1), Some(MouseButton::Right));
        assert_eq!(mouse_button_from_code(2), Some(MouseButton::Middle));
        assert_eq!(mouse_button_from_code(7), Some(MouseButton::Other(7)));
        assert_eq!(mouse_button_from_code(8), None);
        assert_eq!(mouse_button_from_code(-1), None);
    }
}
