//! The indexed display palette and alarm-severity colors.
//!
//! Display files reference colors as integer indices into a fixed
//! 65-entry table. Alarm severities 0..=3 map to green, yellow, red and
//! white; anything outside that range falls back to a neutral gray.

/// A solid RGB color. Alpha is never used by the display model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
}

pub const PALETTE_SIZE: usize = 65;
pub const ALARM_COLOR_COUNT: usize = 5;

const fn c(r: u8, g: u8, b: u8) -> Rgb {
    Rgb::new(r, g, b)
}

/// Fixed palette indexed by display-file color numbers.
static PALETTE: [Rgb; PALETTE_SIZE] = [
    c(255, 255, 255),
    c(236, 236, 236),
    c(218, 218, 218),
    c(200, 200, 200),
    c(187, 187, 187),
    c(174, 174, 174),
    c(158, 158, 158),
    c(145, 145, 145),
    c(133, 133, 133),
    c(120, 120, 120),
    c(105, 105, 105),
    c(90, 90, 90),
    c(70, 70, 70),
    c(45, 45, 45),
    c(0, 0, 0),
    c(0, 216, 0),
    c(30, 187, 0),
    c(51, 153, 0),
    c(45, 127, 0),
    c(33, 108, 0),
    c(253, 0, 0),
    c(222, 19, 9),
    c(190, 25, 11),
    c(160, 18, 7),
    c(130, 4, 0),
    c(88, 147, 255),
    c(89, 126, 225),
    c(75, 110, 199),
    c(58, 94, 171),
    c(39, 84, 141),
    c(251, 243, 74),
    c(249, 218, 60),
    c(238, 182, 43),
    c(225, 144, 21),
    c(205, 97, 0),
    c(255, 176, 255),
    c(214, 127, 226),
    c(174, 78, 188),
    c(139, 26, 150),
    c(97, 10, 117),
    c(164, 170, 255),
    c(135, 147, 226),
    c(106, 115, 193),
    c(77, 82, 164),
    c(52, 51, 134),
    c(199, 187, 109),
    c(183, 157, 92),
    c(164, 126, 60),
    c(125, 86, 39),
    c(88, 52, 15),
    c(153, 255, 255),
    c(115, 223, 255),
    c(78, 165, 249),
    c(42, 99, 228),
    c(10, 0, 184),
    c(235, 241, 181),
    c(212, 219, 157),
    c(187, 193, 135),
    c(166, 164, 98),
    c(139, 130, 57),
    c(115, 255, 107),
    c(82, 218, 59),
    c(60, 180, 32),
    c(40, 147, 21),
    c(26, 115, 9),
];

/// Alarm colors indexed by severity; the final entry is the
/// out-of-range fallback.
static ALARM_COLORS: [Rgb; ALARM_COLOR_COUNT] = [
    c(0, 205, 0),     // none -> green
    c(255, 255, 0),   // minor -> yellow
    c(255, 0, 0),     // major -> red
    c(255, 255, 255), // invalid -> white
    c(204, 204, 204), // fallback gray
];

/// The full indexed palette.
pub fn palette() -> &'static [Rgb; PALETTE_SIZE] {
    &PALETTE
}

/// Reverse lookup for the writer: palette index for an exact color, or
/// `None` when the color is not a palette entry.
pub fn index_for_color(color: Rgb) -> Option<usize> {
    PALETTE.iter().position(|entry| *entry == color)
}

/// Paint color for an alarm severity. Severities outside 0..=3 get the
/// gray fallback.
pub fn alarm_color_for_severity(severity: i16) -> Rgb {
    let index = usize::try_from(severity)
        .ok()
        .filter(|i| *i < ALARM_COLOR_COUNT - 1)
        .unwrap_or(ALARM_COLOR_COUNT - 1);
    ALARM_COLORS[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_expected_anchors() {
        assert_eq!(palette()[0], Rgb::WHITE);
        assert_eq!(palette()[14], Rgb::BLACK);
        assert_eq!(palette()[20], Rgb::new(253, 0, 0));
        assert_eq!(palette()[64], Rgb::new(26, 115, 9));
    }

    #[test]
    fn index_round_trips_for_every_entry() {
        for (i, color) in palette().iter().enumerate() {
            assert_eq!(index_for_color(*color), Some(i));
        }
    }

    #[test]
    fn unknown_color_has_no_index() {
        assert_eq!(index_for_color(Rgb::new(1, 2, 3)), None);
    }

    #[test]
    fn severity_colors() {
        assert_eq!(alarm_color_for_severity(0), Rgb::new(0, 205, 0));
        assert_eq!(alarm_color_for_severity(1), Rgb::new(255, 255, 0));
        assert_eq!(alarm_color_for_severity(2), Rgb::new(255, 0, 0));
        assert_eq!(alarm_color_for_severity(3), Rgb::WHITE);
        assert_eq!(alarm_color_for_severity(-1), Rgb::new(204, 204, 204));
        assert_eq!(alarm_color_for_severity(7), Rgb::new(204, 204, 204));
    }
}
