//! Helvetica advance widths for the standard 14 fonts printpdf embeds by name.
//!
//! Widths are in 1/1000 em, taken from the Adobe AFM files. Accented Latin-1
//! letters share the width of their base glyph, except the dotless-i family
//! which is wider than `i` in both weights.

use super::FontStyle;

/// Points to millimetres.
pub const PT_TO_MM: f32 = 25.4 / 72.0;

const FALLBACK_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015,                                             // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // 'N'..'Z'
    278, 278, 278, 469, 556, 333,                                                   // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // 'n'..'z'
    334, 260, 334, 584,                                                             // '{'..'~'
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Advance width of one character in 1/1000 em.
pub fn char_width(c: char, style: FontStyle) -> u16 {
    let table = match style {
        FontStyle::Regular => &HELVETICA,
        FontStyle::Bold => &HELVETICA_BOLD,
    };
    let ascii = |b: char| table[(b as usize) - 32];

    match c {
        ' '..='~' => ascii(c),
        '\u{a0}' => ascii(' '),
        'À'..='Å' => ascii('A'),
        'Ç' => ascii('C'),
        'È'..='Ë' => ascii('E'),
        'Ì'..='Ï' => ascii('I'),
        'Ñ' => ascii('N'),
        'Ò'..='Ö' | 'Ø' => ascii('O'),
        'Ù'..='Ü' => ascii('U'),
        'Ý' => ascii('Y'),
        'à'..='å' => ascii('a'),
        'ç' => ascii('c'),
        'è'..='ë' => ascii('e'),
        'ì'..='ï' => 278,
        'ñ' => ascii('n'),
        'ò'..='ö' | 'ø' => ascii('o'),
        'ù'..='ü' => ascii('u'),
        'ý' | 'ÿ' => ascii('y'),
        'Æ' => 1000,
        'æ' => 889,
        'ß' => 611,
        '€' | '£' | '§' | '«' | '»' | '–' => 556,
        '×' | '÷' | '±' => 584,
        '©' | '®' => 737,
        '°' => 400,
        '·' => 278,
        '‘' | '’' => match style {
            FontStyle::Regular => 222,
            FontStyle::Bold => 278,
        },
        '“' | '”' => match style {
            FontStyle::Regular => 333,
            FontStyle::Bold => 500,
        },
        '—' => 1000,
        _ => FALLBACK_WIDTH,
    }
}

/// Width of `text` in millimetres when set at `font_size` points.
pub fn text_width_mm(text: &str, font_size: f32, style: FontStyle) -> f32 {
    let units: u32 = text.chars().map(|c| char_width(c, style) as u32).sum();
    units as f32 / 1000.0 * font_size * PT_TO_MM
}

/// Baseline-to-baseline distance for a font size, in millimetres.
pub fn line_height_mm(font_size: f32) -> f32 {
    font_size * 1.2 * PT_TO_MM
}

/// Distance from the top of a line box to its baseline, in millimetres.
pub fn ascent_mm(font_size: f32) -> f32 {
    font_size * 0.8 * PT_TO_MM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_widths() {
        assert_eq!(char_width('A', FontStyle::Regular), 667);
        assert_eq!(char_width('i', FontStyle::Regular), 222);
        assert_eq!(char_width('m', FontStyle::Bold), 889);
        assert_eq!(char_width('~', FontStyle::Bold), 584);
    }

    #[test]
    fn test_accented_letters_use_base_width() {
        assert_eq!(char_width('é', FontStyle::Regular), char_width('e', FontStyle::Regular));
        assert_eq!(char_width('Ó', FontStyle::Bold), char_width('O', FontStyle::Bold));
        // dotless-i family is wider than plain i
        assert!(char_width('í', FontStyle::Regular) > char_width('i', FontStyle::Regular));
    }

    #[test]
    fn test_text_width_scales_with_size() {
        let w10 = text_width_mm("Mileage", 10.0, FontStyle::Regular);
        let w20 = text_width_mm("Mileage", 20.0, FontStyle::Regular);
        assert!((w20 - 2.0 * w10).abs() < 1e-4);
    }

    #[test]
    fn test_bold_is_wider() {
        let regular = text_width_mm("business", 11.0, FontStyle::Regular);
        let bold = text_width_mm("business", 11.0, FontStyle::Bold);
        assert!(bold > regular);
    }
}
