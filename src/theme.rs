//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Colours for the board and UI chrome.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Piece colours (index 0..=5); any tetromino can wear any of them.
    pub pieces: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Sidebar / preview background.
    pub panel_bg: Color,
    /// Borders and grid chrome.
    pub border: Color,
    /// Text (score, level, lines).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        // The classic palette: six saturated piece colours on a near-black board.
        Self {
            pieces: [
                hex("#FF5733"),
                hex("#33FF57"),
                hex("#3357FF"),
                hex("#F1C40F"),
                hex("#9B59B6"),
                hex("#E67E22"),
            ],
            bg: hex("#222222"),
            panel_bg: hex("#333333"),
            border: hex("#555555"),
            main_fg: hex("#DDDDDD"),
            title: hex("#F1C40F"),
        }
    }
}

/// Default-palette hex that is known valid.
fn hex(s: &str) -> Color {
    parse_hex(s).unwrap_or(Color::Reset)
}

impl Theme {
    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to the default palette if path is None or the file is missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default()),
        };
        let s = std::fs::read_to_string(path)?;
        Ok(Self::from_map(&parse_theme_file(&s)))
    }

    /// Map btop theme keys onto our slots; anything missing keeps the default.
    fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        Self {
            pieces: [
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(defaults.pieces[0]),
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(defaults.pieces[1]),
                get("cpu_box").unwrap_or(defaults.pieces[2]),
                get("cpu_mid").unwrap_or(defaults.pieces[3]),
                get("net_box").unwrap_or(defaults.pieces[4]),
                get("hi_fg").or_else(|| get("proc_misc")).unwrap_or(defaults.pieces[5]),
            ],
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(defaults.bg),
            panel_bg: get("selected_bg").unwrap_or(defaults.panel_bg),
            border: get("div_line").unwrap_or(defaults.border),
            main_fg: get("main_fg").unwrap_or(defaults.main_fg),
            title: get("title").unwrap_or(defaults.title),
        }
    }

    /// Piece colour for a colour index (0..6).
    #[inline]
    pub fn piece_color(&self, index: u8) -> Color {
        self.pieces[(index as usize) % self.pieces.len()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(eq) = rest.find('=') {
            let value = rest[eq + 1..]
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string();
            if !value.is_empty() {
                map.insert(key.to_string(), value);
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let comp =
        |d: &str| u8::from_str_radix(d, 16).map_err(|_| ThemeError::InvalidHex(s.to_string()));
    match digits.len() {
        6 => Ok(Color::Rgb(
            comp(&digits[0..2])?,
            comp(&digits[2..4])?,
            comp(&digits[4..6])?,
        )),
        3 => Ok(Color::Rgb(
            comp(&digits[0..1])? * 17,
            comp(&digits[1..2])? * 17,
            comp(&digits[2..3])? * 17,
        )),
        _ => Err(ThemeError::InvalidHex(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_six_digits() {
        let c = parse_hex("#FF5733").unwrap();
        assert!(matches!(c, Color::Rgb(0xFF, 0x57, 0x33)));
    }

    #[test]
    fn parse_hex_three_digits() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn parse_hex_rejects_garbage() {
        assert!(parse_hex("#F5").is_err());
        assert!(parse_hex("#GGHHII").is_err());
    }

    #[test]
    fn parse_theme_line() {
        let map = parse_theme_file(r##"theme[main_bg]="#222222""##);
        assert_eq!(map.get("main_bg"), Some(&"#222222".to_string()));
    }

    #[test]
    fn theme_keys_override_defaults() {
        let mut map = HashMap::new();
        map.insert("main_bg".to_string(), "#000000".to_string());
        map.insert("cpu_box".to_string(), "#123456".to_string());
        let theme = Theme::from_map(&map);
        assert!(matches!(theme.bg, Color::Rgb(0, 0, 0)));
        assert!(matches!(theme.pieces[2], Color::Rgb(0x12, 0x34, 0x56)));
        // Untouched slots keep the defaults.
        assert!(matches!(theme.pieces[0], Color::Rgb(0xFF, 0x57, 0x33)));
    }

    #[test]
    fn piece_color_wraps_index() {
        let theme = Theme::default();
        assert_eq!(theme.piece_color(0), theme.piece_color(6));
    }
}
