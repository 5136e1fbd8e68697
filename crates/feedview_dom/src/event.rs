use crate::NodeId;

/// Events delivered to delegated handlers on the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A click or tap on a node. Handlers resolve the target upwards.
    Click { target: NodeId },
    /// The page scrolled.
    Scroll,
    /// The pointer moved anywhere over the page.
    MouseMoved,
    /// Keyboard key pressed.
    KeyPressed { key: Key },
}

/// Keyboard keys (simplified set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Tab,
    Space,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Parse a key name as written in shortcut sequences (`"g"`, `"esc"`, `"?"`).
    pub fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            "esc" | "escape" => Key::Escape,
            "enter" | "return" => Key::Enter,
            "tab" => Key::Tab,
            "space" => Key::Space,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            _ => {
                let mut chars = name.chars();
                let first = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                Key::Char(first)
            }
        };
        Some(key)
    }
}

/// Outcome of dispatching an event to a delegated handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatch {
    /// A handler recognized the target and acted on it.
    pub handled: bool,
    /// The browser default (link navigation) must not run.
    pub default_prevented: bool,
}

impl Dispatch {
    /// Nothing matched; the default action proceeds.
    pub fn ignored() -> Self {
        Self::default()
    }

    /// Handled and default action suppressed.
    pub fn consumed() -> Self {
        Self {
            handled: true,
            default_prevented: true,
        }
    }

    /// Recognized, but the default action (navigation) must proceed.
    pub fn passthrough() -> Self {
        Self {
            handled: true,
            default_prevented: false,
        }
    }

    /// Default suppressed without any state change.
    pub fn suppressed() -> Self {
        Self {
            handled: false,
            default_prevented: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_name() {
        assert_eq!(Key::from_name("esc"), Some(Key::Escape));
        assert_eq!(Key::from_name("?"), Some(Key::Char('?')));
        assert_eq!(Key::from_name("g"), Some(Key::Char('g')));
        assert_eq!(Key::from_name("ctrl"), None);
        assert_eq!(Key::from_name(""), None);
    }
}
