//! Key bindings and keydown interception.

use std::{fmt, str::FromStr};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::Deserialize;

/// What the surface should do with a key before its own handling runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interception {
    /// Let the REPL handle the key as usual.
    Handle,
    /// Skip the REPL's handling and hand the key to the host.
    PassThrough,
}

/// Hook consulted for every key event.
pub trait KeydownHook {
    fn intercept(&mut self, key: &KeyEvent) -> Interception;
}

impl<F: FnMut(&KeyEvent) -> Interception> KeydownHook for F {
    fn intercept(&mut self, key: &KeyEvent) -> Interception {
        self(key)
    }
}

/// A key plus modifiers, written as `"ctrl+r"`, `"alt+shift+x"`, `"f5"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        if key.modifiers != self.modifiers {
            return false;
        }
        match (self.code, key.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeyError(String);

impl fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid key binding `{}`", self.0)
    }
}

impl std::error::Error for ParseKeyError {}

impl FromStr for KeyBinding {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseKeyError(s.to_string());
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = parts.pop().filter(|k| !k.is_empty()).ok_or_else(err)?;

        let mut modifiers = KeyModifiers::NONE;
        for part in parts {
            modifiers |= match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "alt" | "meta" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                _ => return Err(err()),
            };
        }

        let lower = key.to_ascii_lowercase();
        let code = match lower.as_str() {
            "enter" | "return" => KeyCode::Enter,
            "esc" | "escape" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "backspace" => KeyCode::Backspace,
            "delete" | "del" => KeyCode::Delete,
            "insert" | "ins" => KeyCode::Insert,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" => KeyCode::PageUp,
            "pagedown" => KeyCode::PageDown,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "space" => KeyCode::Char(' '),
            f if f.len() > 1 && f.starts_with('f') => {
                let n: u8 = f[1..].parse().map_err(|_| err())?;
                if !(1..=24).contains(&n) {
                    return Err(err());
                }
                KeyCode::F(n)
            }
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c.to_ascii_lowercase()),
                    _ => return Err(err()),
                }
            }
        };

        Ok(Self { code, modifiers })
    }
}

impl TryFrom<String> for KeyBinding {
    type Error = ParseKeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("Ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("Alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("Shift+")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            KeyCode::F(n) => write!(f, "F{n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Passes the configured bindings through to the host and handles the rest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeydownPolicy {
    #[serde(default)]
    pub pass_through: Vec<KeyBinding>,
}

impl Default for KeydownPolicy {
    fn default() -> Self {
        Self {
            pass_through: vec![KeyBinding::ctrl('r')],
        }
    }
}

impl KeydownHook for KeydownPolicy {
    fn intercept(&mut self, key: &KeyEvent) -> Interception {
        if self.pass_through.iter().any(|b| b.matches(key)) {
            Interception::PassThrough
        } else {
            Interception::Handle
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn parse_ctrl_char() {
        let b: KeyBinding = "ctrl+r".parse().unwrap();
        assert_eq!(b, KeyBinding::ctrl('r'));
        assert_eq!("Ctrl + R".parse::<KeyBinding>().unwrap(), b);
    }

    #[test]
    fn parse_named_and_function_keys() {
        assert_eq!(
            "alt+shift+pageup".parse::<KeyBinding>().unwrap(),
            KeyBinding::new(KeyCode::PageUp, KeyModifiers::ALT | KeyModifiers::SHIFT)
        );
        assert_eq!(
            "f5".parse::<KeyBinding>().unwrap(),
            KeyBinding::new(KeyCode::F(5), KeyModifiers::NONE)
        );
        assert_eq!(
            "f".parse::<KeyBinding>().unwrap(),
            KeyBinding::new(KeyCode::Char('f'), KeyModifiers::NONE)
        );
    }

    #[test]
    fn parse_errors() {
        for bad in ["", "ctrl+", "hyper+x", "f99", "ctrl+abc"] {
            assert!(bad.parse::<KeyBinding>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn matching_ignores_char_case() {
        let b = KeyBinding::ctrl('r');
        assert!(b.matches(&key(KeyCode::Char('r'), KeyModifiers::CONTROL)));
        assert!(b.matches(&key(KeyCode::Char('R'), KeyModifiers::CONTROL)));
        assert!(!b.matches(&key(KeyCode::Char('r'), KeyModifiers::NONE)));
        assert!(!b.matches(&key(KeyCode::Char('t'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn display() {
        assert_eq!(KeyBinding::ctrl('r').to_string(), "Ctrl+R");
        assert_eq!(
            KeyBinding::new(KeyCode::F(2), KeyModifiers::NONE).to_string(),
            "F2"
        );
    }

    #[test]
    fn default_policy_passes_ctrl_r() {
        let mut policy = KeydownPolicy::default();
        assert_eq!(
            policy.intercept(&key(KeyCode::Char('r'), KeyModifiers::CONTROL)),
            Interception::PassThrough
        );
        assert_eq!(
            policy.intercept(&key(KeyCode::Char('r'), KeyModifiers::NONE)),
            Interception::Handle
        );
    }

    #[test]
    fn closure_hook() {
        let mut hook = |k: &KeyEvent| {
            if k.code == KeyCode::F(1) {
                Interception::PassThrough
            } else {
                Interception::Handle
            }
        };
        assert_eq!(
            hook.intercept(&key(KeyCode::F(1), KeyModifiers::NONE)),
            Interception::PassThrough
        );
    }

    #[test]
    fn policy_from_toml() {
        let policy: KeydownPolicy = toml::from_str(r#"pass_through = ["ctrl+r", "f5"]"#).unwrap();
        assert_eq!(policy.pass_through.len(), 2);
        assert!(toml::from_str::<KeydownPolicy>(r#"pass_through = ["nope+x"]"#).is_err());
    }
}
