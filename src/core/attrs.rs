//! Text attributes
//!
//! [`ColorAttribute`] is a bitmask whose low 16 bits are laid out exactly
//! like a Windows console character attribute word, so the legacy console
//! backend can hand it to `SetConsoleTextAttribute` unchanged. The high
//! bits mark "a foreground/background colour is selected" (so that black
//! is a non-zero value) and carry the bold flag, which the console has no
//! slot for.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ColorAttribute: u32 {
        const FG_BLUE      = 0x0000_0001;
        const FG_GREEN     = 0x0000_0002;
        const FG_RED       = 0x0000_0004;
        const FG_INTENSITY = 0x0000_0008;
        const BG_BLUE      = 0x0000_0010;
        const BG_GREEN     = 0x0000_0020;
        const BG_RED       = 0x0000_0040;
        const BG_INTENSITY = 0x0000_0080;
        const UNDERSCORE   = 0x0000_8000;
        const FG_SET       = 0x0001_0000;
        const BG_SET       = 0x0002_0000;
        const BOLD         = 0x0004_0000;

        const FOREGROUND_DARK_BLACK     = Self::FG_SET.bits();
        const FOREGROUND_DARK_BLUE      = Self::FG_SET.bits() | Self::FG_BLUE.bits();
        const FOREGROUND_DARK_GREEN     = Self::FG_SET.bits() | Self::FG_GREEN.bits();
        const FOREGROUND_DARK_CYAN      = Self::FOREGROUND_DARK_BLUE.bits() | Self::FG_GREEN.bits();
        const FOREGROUND_DARK_RED       = Self::FG_SET.bits() | Self::FG_RED.bits();
        const FOREGROUND_DARK_MAGENTA   = Self::FOREGROUND_DARK_RED.bits() | Self::FG_BLUE.bits();
        const FOREGROUND_DARK_YELLOW    = Self::FOREGROUND_DARK_RED.bits() | Self::FG_GREEN.bits();
        const FOREGROUND_DARK_WHITE     = Self::FOREGROUND_DARK_YELLOW.bits() | Self::FG_BLUE.bits();
        const FOREGROUND_BRIGHT_BLACK   = Self::FOREGROUND_DARK_BLACK.bits() | Self::FG_INTENSITY.bits();
        const FOREGROUND_BRIGHT_BLUE    = Self::FOREGROUND_DARK_BLUE.bits() | Self::FG_INTENSITY.bits();
        const FOREGROUND_BRIGHT_GREEN   = Self::FOREGROUND_DARK_GREEN.bits() | Self::FG_INTENSITY.bits();
        const FOREGROUND_BRIGHT_CYAN    = Self::FOREGROUND_DARK_CYAN.bits() | Self::FG_INTENSITY.bits();
        const FOREGROUND_BRIGHT_RED     = Self::FOREGROUND_DARK_RED.bits() | Self::FG_INTENSITY.bits();
        const FOREGROUND_BRIGHT_MAGENTA = Self::FOREGROUND_DARK_MAGENTA.bits() | Self::FG_INTENSITY.bits();
        const FOREGROUND_BRIGHT_YELLOW  = Self::FOREGROUND_DARK_YELLOW.bits() | Self::FG_INTENSITY.bits();
        const FOREGROUND_BRIGHT_WHITE   = Self::FOREGROUND_DARK_WHITE.bits() | Self::FG_INTENSITY.bits();

        const BACKGROUND_DARK_BLACK     = Self::BG_SET.bits();
        const BACKGROUND_DARK_BLUE      = Self::BG_SET.bits() | Self::BG_BLUE.bits();
        const BACKGROUND_DARK_GREEN     = Self::BG_SET.bits() | Self::BG_GREEN.bits();
        const BACKGROUND_DARK_CYAN      = Self::BACKGROUND_DARK_BLUE.bits() | Self::BG_GREEN.bits();
        const BACKGROUND_DARK_RED       = Self::BG_SET.bits() | Self::BG_RED.bits();
        const BACKGROUND_DARK_MAGENTA   = Self::BACKGROUND_DARK_RED.bits() | Self::BG_BLUE.bits();
        const BACKGROUND_DARK_YELLOW    = Self::BACKGROUND_DARK_RED.bits() | Self::BG_GREEN.bits();
        const BACKGROUND_DARK_WHITE     = Self::BACKGROUND_DARK_YELLOW.bits() | Self::BG_BLUE.bits();
        const BACKGROUND_BRIGHT_BLACK   = Self::BACKGROUND_DARK_BLACK.bits() | Self::BG_INTENSITY.bits();
        const BACKGROUND_BRIGHT_BLUE    = Self::BACKGROUND_DARK_BLUE.bits() | Self::BG_INTENSITY.bits();
        const BACKGROUND_BRIGHT_GREEN   = Self::BACKGROUND_DARK_GREEN.bits() | Self::BG_INTENSITY.bits();
        const BACKGROUND_BRIGHT_CYAN    = Self::BACKGROUND_DARK_CYAN.bits() | Self::BG_INTENSITY.bits();
        const BACKGROUND_BRIGHT_RED     = Self::BACKGROUND_DARK_RED.bits() | Self::BG_INTENSITY.bits();
        const BACKGROUND_BRIGHT_MAGENTA = Self::BACKGROUND_DARK_MAGENTA.bits() | Self::BG_INTENSITY.bits();
        const BACKGROUND_BRIGHT_YELLOW  = Self::BACKGROUND_DARK_YELLOW.bits() | Self::BG_INTENSITY.bits();
        const BACKGROUND_BRIGHT_WHITE   = Self::BACKGROUND_DARK_WHITE.bits() | Self::BG_INTENSITY.bits();
    }
}

impl ColorAttribute {
    /// Every bit that selects a foreground colour
    pub const FOREGROUND: Self = Self::from_bits_retain(0x0001_000F);
    /// Every bit that selects a background colour
    pub const BACKGROUND: Self = Self::from_bits_retain(0x0002_00F0);
    /// Bits that are styling rather than colour
    pub const STYLE: Self = Self::from_bits_retain(0x0004_8000);

    /// Colour bits only, with styling removed
    pub fn colors(self) -> Self {
        self & (Self::FOREGROUND | Self::BACKGROUND)
    }

    pub fn foreground(self) -> Option<Self> {
        let fg = self & Self::FOREGROUND;
        (!fg.is_empty()).then(|| fg | Self::FG_SET)
    }

    pub fn background(self) -> Option<Self> {
        let bg = self & Self::BACKGROUND;
        (!bg.is_empty()).then(|| bg | Self::BG_SET)
    }

    /// Windows console attribute word (bold has no console bit and is dropped)
    pub fn console_word(self) -> u16 {
        (self.bits() & 0xFFFF) as u16
    }
}

/// Persistent style applied to writes that carry no explicit attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub bold: bool,
    pub underscore: bool,
    pub color: Option<ColorAttribute>,
}

impl Style {
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.underscore && self.color.is_none()
    }

    /// Attribute value equivalent to this style
    pub fn to_attributes(&self) -> ColorAttribute {
        let mut attrs = self.color.unwrap_or_default();
        if self.bold {
            attrs |= ColorAttribute::BOLD;
        }
        if self.underscore {
            attrs |= ColorAttribute::UNDERSCORE;
        }
        attrs
    }
}

/// Escape sequence for each named colour, bold and underscore.
pub static ANSI_TABLE: [(ColorAttribute, &str); 34] = [
    (ColorAttribute::FOREGROUND_DARK_BLACK, "\x1b[30m"),
    (ColorAttribute::FOREGROUND_DARK_RED, "\x1b[31m"),
    (ColorAttribute::FOREGROUND_DARK_GREEN, "\x1b[32m"),
    (ColorAttribute::FOREGROUND_DARK_YELLOW, "\x1b[33m"),
    (ColorAttribute::FOREGROUND_DARK_BLUE, "\x1b[34m"),
    (ColorAttribute::FOREGROUND_DARK_MAGENTA, "\x1b[35m"),
    (ColorAttribute::FOREGROUND_DARK_CYAN, "\x1b[36m"),
    (ColorAttribute::FOREGROUND_DARK_WHITE, "\x1b[37m"),
    (ColorAttribute::FOREGROUND_BRIGHT_BLACK, "\x1b[30m;1m"),
    (ColorAttribute::FOREGROUND_BRIGHT_RED, "\x1b[31m;1m"),
    (ColorAttribute::FOREGROUND_BRIGHT_GREEN, "\x1b[32m;1m"),
    (ColorAttribute::FOREGROUND_BRIGHT_YELLOW, "\x1b[33m;1m"),
    (ColorAttribute::FOREGROUND_BRIGHT_BLUE, "\x1b[34m;1m"),
    (ColorAttribute::FOREGROUND_BRIGHT_MAGENTA, "\x1b[35m;1m"),
    (ColorAttribute::FOREGROUND_BRIGHT_CYAN, "\x1b[36m;1m"),
    (ColorAttribute::FOREGROUND_BRIGHT_WHITE, "\x1b[37m;1m"),
    (ColorAttribute::BACKGROUND_DARK_BLACK, "\x1b[40m"),
    (ColorAttribute::BACKGROUND_DARK_RED, "\x1b[41m"),
    (ColorAttribute::BACKGROUND_DARK_GREEN, "\x1b[42m"),
    (ColorAttribute::BACKGROUND_DARK_YELLOW, "\x1b[43m"),
    (ColorAttribute::BACKGROUND_DARK_BLUE, "\x1b[44m"),
    (ColorAttribute::BACKGROUND_DARK_MAGENTA, "\x1b[45m"),
    (ColorAttribute::BACKGROUND_DARK_CYAN, "\x1b[46m"),
    (ColorAttribute::BACKGROUND_DARK_WHITE, "\x1b[47m"),
    (ColorAttribute::BACKGROUND_BRIGHT_BLACK, "\x1b[40m;1m"),
    (ColorAttribute::BACKGROUND_BRIGHT_RED, "\x1b[41m;1m"),
    (ColorAttribute::BACKGROUND_BRIGHT_GREEN, "\x1b[42m;1m"),
    (ColorAttribute::BACKGROUND_BRIGHT_YELLOW, "\x1b[43m;1m"),
    (ColorAttribute::BACKGROUND_BRIGHT_BLUE, "\x1b[44m;1m"),
    (ColorAttribute::BACKGROUND_BRIGHT_MAGENTA, "\x1b[45m;1m"),
    (ColorAttribute::BACKGROUND_BRIGHT_CYAN, "\x1b[46m;1m"),
    (ColorAttribute::BACKGROUND_BRIGHT_WHITE, "\x1b[47m;1m"),
    (ColorAttribute::BOLD, "\x1b[1m"),
    (ColorAttribute::UNDERSCORE, "\x1b[4m"),
];

/// Exact table lookup for a single named attribute
pub fn ansi_code(attr: ColorAttribute) -> Option<&'static str> {
    ANSI_TABLE
        .iter()
        .find(|(key, _)| *key == attr)
        .map(|(_, code)| *code)
}

/// Escape sequence selecting the colours in `attrs`, foreground first.
///
/// Styling bits are ignored; an attribute with no colour bits yields an
/// empty string.
pub fn color_sequence(attrs: ColorAttribute) -> String {
    let mut seq = String::new();
    for part in [attrs.foreground(), attrs.background()].into_iter().flatten() {
        if let Some(code) = ansi_code(part) {
            seq.push_str(code);
        }
    }
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_foregrounds() -> Vec<ColorAttribute> {
        ANSI_TABLE[..16].iter().map(|(attr, _)| *attr).collect()
    }

    fn all_backgrounds() -> Vec<ColorAttribute> {
        ANSI_TABLE[16..32].iter().map(|(attr, _)| *attr).collect()
    }

    #[test]
    fn test_table_keys_are_unique() {
        for (i, (a, _)) in ANSI_TABLE.iter().enumerate() {
            for (b, _) in &ANSI_TABLE[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_lookup_is_total_over_composable_values() {
        let mut fgs: Vec<Option<ColorAttribute>> = all_foregrounds().into_iter().map(Some).collect();
        fgs.push(None);
        let mut bgs: Vec<Option<ColorAttribute>> = all_backgrounds().into_iter().map(Some).collect();
        bgs.push(None);

        for fg in &fgs {
            for bg in &bgs {
                let attrs = fg.unwrap_or_default() | bg.unwrap_or_default();
                let seq = color_sequence(attrs);
                let expected = [*fg, *bg]
                    .into_iter()
                    .flatten()
                    .map(|part| ansi_code(part).unwrap())
                    .collect::<String>();
                assert_eq!(seq, expected, "attrs {attrs:?}");
                assert_eq!(seq.is_empty(), fg.is_none() && bg.is_none());
            }
        }
        assert_eq!(ansi_code(ColorAttribute::BOLD), Some("\x1b[1m"));
        assert_eq!(ansi_code(ColorAttribute::UNDERSCORE), Some("\x1b[4m"));
    }

    #[test]
    fn test_ansi_codes() {
        assert_eq!(color_sequence(ColorAttribute::FOREGROUND_DARK_RED), "\x1b[31m");
        assert_eq!(color_sequence(ColorAttribute::FOREGROUND_BRIGHT_RED), "\x1b[31m;1m");
        assert_eq!(color_sequence(ColorAttribute::BACKGROUND_DARK_BLUE), "\x1b[44m");
        assert_eq!(
            color_sequence(ColorAttribute::FOREGROUND_DARK_YELLOW | ColorAttribute::BACKGROUND_BRIGHT_CYAN),
            "\x1b[33m\x1b[46m;1m"
        );
        assert_eq!(color_sequence(ColorAttribute::BOLD | ColorAttribute::UNDERSCORE), "");
    }

    #[test]
    fn test_console_word_matches_win32_layout() {
        assert_eq!(ColorAttribute::FOREGROUND_BRIGHT_RED.console_word(), 0x0C);
        assert_eq!(ColorAttribute::BACKGROUND_DARK_BLUE.console_word(), 0x10);
        assert_eq!(ColorAttribute::FOREGROUND_DARK_BLACK.console_word(), 0x00);
        assert_eq!(ColorAttribute::UNDERSCORE.console_word(), 0x8000);
        assert_eq!(ColorAttribute::BOLD.console_word(), 0);
    }

    #[test]
    fn test_style_to_attributes() {
        let style = Style {
            bold: true,
            underscore: false,
            color: Some(ColorAttribute::FOREGROUND_DARK_GREEN),
        };
        assert_eq!(
            style.to_attributes(),
            ColorAttribute::BOLD | ColorAttribute::FOREGROUND_DARK_GREEN
        );
        assert!(Style::default().is_plain());
        assert!(!style.is_plain());
    }
}
