//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::tetris::Tint;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Tile values with a dedicated colour: 0 (empty), then 2, 4, ... 2048.
const TILE_SLOTS: usize = 12;

/// Theme file keys for each tile slot, in slot order.
const TILE_KEYS: [&str; TILE_SLOTS] = [
    "tile_0", "tile_2", "tile_4", "tile_8", "tile_16", "tile_32", "tile_64", "tile_128",
    "tile_256", "tile_512", "tile_1024", "tile_2048",
];

/// Theme file keys for each tetromino tint, in `Tint::ALL` order.
const PIECE_KEYS: [&str; 7] = [
    "piece_cyan",
    "piece_yellow",
    "piece_purple",
    "piece_orange",
    "piece_blue",
    "piece_green",
    "piece_red",
];

/// Tile and piece colours plus UI colours, optionally loaded from a theme file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// 2048 tile backgrounds, indexed by `tile_slot`.
    pub tiles: [Color; TILE_SLOTS],
    /// Background for tile values without a slot (above 2048).
    pub tile_fallback: Color,
    /// Tile number colour.
    pub tile_fg: Color,
    /// Tetromino colours, indexed by `Tint::index`.
    pub pieces: [Color; 7],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, level).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Key hints.
    pub inactive_fg: Color,
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
        Self::terminal_default()
    }
}

/// Slot for a tile value: 0 → 0, 2^n → n for 2..=2048, otherwise none.
pub fn tile_slot(value: u32) -> Option<usize> {
    match value {
        0 => Some(0),
        v if v.is_power_of_two() && v >= 2 => {
            let slot = v.trailing_zeros() as usize;
            (slot < TILE_SLOTS).then_some(slot)
        }
        _ => None,
    }
}

impl Theme {
    /// Classic 16/256-colour terminal palette.
    pub fn terminal_default() -> Self {
        Self {
            tiles: [
                Color::Indexed(243), // empty
                Color::Red,
                Color::Green,
                Color::Yellow,
                Color::Blue,
                Color::Magenta,
                Color::Cyan,
                Color::Indexed(247),
                Color::Indexed(209),
                Color::Indexed(93),
                Color::Indexed(208),
                Color::Indexed(209),
            ],
            tile_fallback: Color::White,
            tile_fg: Color::Reset,
            pieces: [
                Color::Cyan,
                Color::LightYellow,
                Color::Magenta,
                Color::Yellow, // orange
                Color::Blue,
                Color::Green,
                Color::Red,
            ],
            bg: Color::Reset,
            div_line: Color::Gray,
            main_fg: Color::Reset,
            title: Color::Yellow,
            inactive_fg: Color::DarkGray,
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to the default theme if path is None or the file is missing.
    /// `palette` selects the piece colour variant.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::terminal_default();
        t.apply_palette(palette);
        t
    }

    /// Override piece colours for high-contrast or colorblind.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        let hexes = match palette {
            crate::Palette::Normal => return,
            crate::Palette::HighContrast => [
                "#00FFFF", "#FFFF00", "#FF00FF", "#FF8800", "#0055FF", "#00FF00", "#FF0000",
            ],
            // Okabe-Ito inspired; no pair relies on red/green alone.
            crate::Palette::Colorblind => [
                "#56B4E9", "#F0E442", "#CC79A7", "#E69F00", "#0072B2", "#009E73", "#D55E00",
            ],
        };
        for (slot, hex) in self.pieces.iter_mut().zip(hexes) {
            if let Ok(c) = parse_hex(hex) {
                *slot = c;
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let mut theme = Self::terminal_default();
        for (slot, key) in theme.tiles.iter_mut().zip(TILE_KEYS) {
            if let Some(c) = get(key) {
                *slot = c;
            }
        }
        for (slot, key) in theme.pieces.iter_mut().zip(PIECE_KEYS) {
            if let Some(c) = get(key) {
                *slot = c;
            }
        }
        let fields: [(&str, &mut Color); 7] = [
            ("tile_other", &mut theme.tile_fallback),
            ("tile_fg", &mut theme.tile_fg),
            ("main_bg", &mut theme.bg),
            ("div_line", &mut theme.div_line),
            ("main_fg", &mut theme.main_fg),
            ("title", &mut theme.title),
            ("inactive_fg", &mut theme.inactive_fg),
        ];
        for (key, slot) in fields {
            if let Some(c) = get(key) {
                *slot = c;
            }
        }
        theme
    }

    /// Background for a 2048 tile; unmapped values get `tile_fallback`.
    #[inline]
    pub fn tile_color(&self, value: u32) -> Color {
        tile_slot(value).map_or(self.tile_fallback, |slot| self.tiles[slot])
    }

    #[inline]
    pub fn piece_color(&self, tint: Tint) -> Color {
        self.pieces[tint.index()]
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
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
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
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let channel = |digits: &str| {
        u8::from_str_radix(digits, 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = if s.len() == 6 && s.is_ascii() {
        (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?)
    } else if s.len() == 3 && s.is_ascii() {
        (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        )
    } else {
        return Err(ThemeError::InvalidHex(s.to_string()));
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Palette;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(matches!(parse_hex("#12345"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#GGGGGG"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[main_bg]="#31353F""##);
        assert_eq!(map.get("main_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_tile_slots() {
        assert_eq!(tile_slot(0), Some(0));
        assert_eq!(tile_slot(2), Some(1));
        assert_eq!(tile_slot(2048), Some(11));
        assert_eq!(tile_slot(4096), None);
        assert_eq!(tile_slot(3), None);
        assert_eq!(tile_slot(1), None);
    }

    #[test]
    fn test_tile_color_falls_back_above_2048() {
        let theme = Theme::default();
        assert_eq!(theme.tile_color(2), Color::Red);
        assert_eq!(theme.tile_color(2048), Color::Indexed(209));
        assert_eq!(theme.tile_color(4096), Color::White);
        assert_eq!(theme.tile_color(6), Color::White);
    }

    #[test]
    fn test_from_map_overrides_known_keys_only() {
        let map = parse_theme_file(
            "# comment\ntheme[tile_2]=\"#010203\"\ntheme[piece_red]='#FF0000'\ntheme[tile_other]=\"nope\"\n",
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.tile_color(2), Color::Rgb(1, 2, 3));
        assert_eq!(theme.piece_color(Tint::Red), Color::Rgb(255, 0, 0));
        assert_eq!(theme.tile_fallback, Color::White);
        assert_eq!(theme.piece_color(Tint::Cyan), Color::Cyan);
    }

    #[test]
    fn test_load_missing_file_uses_default() {
        let theme = Theme::load(Some(Path::new("/nonexistent/termarcade.theme")), Palette::Normal).unwrap();
        assert_eq!(theme, Theme::default());
    }

    #[test]
    fn test_palette_changes_pieces_not_tiles() {
        let mut theme = Theme::default();
        theme.apply_palette(Palette::Colorblind);
        assert_eq!(theme.piece_color(Tint::Orange), Color::Rgb(0xE6, 0x9F, 0x00));
        assert_eq!(theme.tiles, Theme::default().tiles);
    }
}
