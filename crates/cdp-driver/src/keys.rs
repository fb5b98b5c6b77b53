//! Key names to CDP key event fields.

/// Fields of an `Input.dispatchKeyEvent` for one named key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    pub key: String,
    pub code: String,
    pub text: Option<String>,
    pub virtual_key_code: i64,
}

/// Resolve a key name as the reasoning service phrases it ("Space",
/// "ArrowLeft", "Enter", "a").
pub fn key_definition(name: &str) -> KeyDefinition {
    let named = |key: &str, code: &str, text: Option<&str>, vk: i64| KeyDefinition {
        key: key.to_string(),
        code: code.to_string(),
        text: text.map(str::to_string),
        virtual_key_code: vk,
    };

    match name.to_ascii_lowercase().as_str() {
        "space" | " " | "spacebar" => named(" ", "Space", Some(" "), 32),
        "enter" | "return" => named("Enter", "Enter", Some("\r"), 13),
        "escape" | "esc" => named("Escape", "Escape", None, 27),
        "tab" => named("Tab", "Tab", None, 9),
        "backspace" => named("Backspace", "Backspace", None, 8),
        "shift" => named("Shift", "ShiftLeft", None, 16),
        "control" | "ctrl" => named("Control", "ControlLeft", None, 17),
        "arrowleft" | "left" => named("ArrowLeft", "ArrowLeft", None, 37),
        "arrowup" | "up" => named("ArrowUp", "ArrowUp", None, 38),
        "arrowright" | "right" => named("ArrowRight", "ArrowRight", None, 39),
        "arrowdown" | "down" => named("ArrowDown", "ArrowDown", None, 40),
        _ => single_char(name).unwrap_or_else(|| named(name, name, None, 0)),
    }
}

fn single_char(name: &str) -> Option<KeyDefinition> {
    let mut chars = name.chars();
    let ch = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let upper = ch.to_ascii_uppercase();
    let code = if ch.is_ascii_alphabetic() {
        format!("Key{upper}")
    } else if ch.is_ascii_digit() {
        format!("Digit{ch}")
    } else {
        return Some(KeyDefinition {
            key: ch.to_string(),
            code: String::new(),
            text: Some(ch.to_string()),
            virtual_key_code: 0,
        });
    };
    Some(KeyDefinition {
        key: ch.to_string(),
        code,
        text: Some(ch.to_string()),
        virtual_key_code: upper as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_keys() {
        let space = key_definition("Space");
        assert_eq!(space.key, " ");
        assert_eq!(space.code, "Space");
        assert_eq!(space.virtual_key_code, 32);

        assert_eq!(key_definition("left").key, "ArrowLeft");
        assert_eq!(key_definition("Enter").text.as_deref(), Some("\r"));
    }

    #[test]
    fn test_character_keys() {
        let w = key_definition("w");
        assert_eq!(w.code, "KeyW");
        assert_eq!(w.virtual_key_code, 'W' as i64);
        assert_eq!(key_definition("7").code, "Digit7");
    }

    #[test]
    fn test_unknown_key_passes_through() {
        let f5 = key_definition("F5");
        assert_eq!(f5.key, "F5");
        assert!(f5.text.is_none());
    }
}
