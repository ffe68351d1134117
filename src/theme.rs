use tui::style::{Color, Modifier, Style};

use crate::{
    config::ThemeConfig,
    error::{ReplError, Result},
};

/// Resolved styles for everything the transcript shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub prompt: Style,
    pub success: Style,
    pub error: Style,
    pub notice: Style,
    pub keyword: Style,
    pub literal: Style,
    pub comment: Style,
    pub operator: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            prompt: Style::default().fg(Color::Cyan),
            success: Style::default().fg(Color::Green),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            notice: Style::default().fg(Color::Yellow),
            keyword: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            literal: Style::default().fg(Color::Magenta),
            comment: Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            operator: Style::default().fg(Color::LightYellow),
        }
    }
}

impl Theme {
    /// Build a theme from configured colour names, keeping defaults for
    /// anything left unset.
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let mut theme = Self::default();
        let fields = [
            (&config.prompt, &mut theme.prompt),
            (&config.success, &mut theme.success),
            (&config.error, &mut theme.error),
            (&config.notice, &mut theme.notice),
        ];
        for (name, style) in fields {
            if let Some(name) = name {
                let color = parse_color(name)
                    .ok_or_else(|| ReplError::Config(format!("unknown colour `{name}`")))?;
                *style = style.fg(color);
            }
        }
        Ok(theme)
    }
}

/// Parse a colour name (`"red"`, `"light-blue"`) or a `#rrggbb` value.
pub fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }

    let name: String = s
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect();
    let color = match name.as_str() {
        "reset" | "default" => Color::Reset,
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        "white" => Color::White,
        _ => return None,
    };
    Some(color)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn named_colours() {
        assert_eq!(parse_color("red"), Some(Color::Red));
        assert_eq!(parse_color("Light-Blue"), Some(Color::LightBlue));
        assert_eq!(parse_color("dark_grey"), Some(Color::DarkGray));
        assert_eq!(parse_color("chartreuse"), None);
    }

    #[test]
    fn hex_colours() {
        assert_eq!(parse_color("#ff8000"), Some(Color::Rgb(255, 128, 0)));
        assert_eq!(parse_color("#FFF"), None);
        assert_eq!(parse_color("#gg0000"), None);
    }

    #[test]
    fn config_overrides_only_set_fields() {
        let config = ThemeConfig {
            error: Some("magenta".into()),
            ..ThemeConfig::default()
        };
        let theme = Theme::from_config(&config).unwrap();
        assert_eq!(theme.error.fg, Some(Color::Magenta));
        assert_eq!(theme.success, Theme::default().success);
    }

    #[test]
    fn unknown_colour_is_a_config_error() {
        let config = ThemeConfig {
            prompt: Some("ultraviolet".into()),
            ..ThemeConfig::default()
        };
        let err = Theme::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("ultraviolet"));
    }
}
