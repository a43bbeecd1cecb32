/// Font-metrics capability used to measure a line before it is placed.
pub trait TextMeasure: Sync {
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base14Family {
    Helvetica,
    Courier,
    Times,
}

/// Advance widths for the standard PDF fonts, in 1/1000 em.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base14Metrics {
    family: Base14Family,
}

// Helvetica AFM advances for U+0020..=U+007E.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_MISSING: u16 = 556;
const COURIER_ADVANCE: u16 = 600;

impl Base14Metrics {
    pub fn helvetica() -> Self {
        Self {
            family: Base14Family::Helvetica,
        }
    }

    pub fn courier() -> Self {
        Self {
            family: Base14Family::Courier,
        }
    }

    /// Picks metrics from a `/BaseFont` name. Subset prefixes (`ABCDEF+`) are
    /// ignored; anything unrecognised measures as Helvetica.
    pub fn for_base_font(name: &str) -> Self {
        let name = name.split_once('+').map(|(_, rest)| rest).unwrap_or(name);
        let lower = name.to_ascii_lowercase();
        let family = if lower.starts_with("courier") {
            Base14Family::Courier
        } else if lower.starts_with("times") {
            Base14Family::Times
        } else {
            Base14Family::Helvetica
        };
        Self { family }
    }

    pub fn family(&self) -> Base14Family {
        self.family
    }

    pub fn char_width(&self, ch: char) -> u16 {
        match self.family {
            Base14Family::Courier => COURIER_ADVANCE,
            // Times has no table of its own here; Helvetica advances are close
            // enough for locating tokens.
            Base14Family::Helvetica | Base14Family::Times => {
                let code = ch as u32;
                if (0x20..=0x7e).contains(&code) {
                    HELVETICA_ASCII[(code - 0x20) as usize]
                } else {
                    HELVETICA_MISSING
                }
            }
        }
    }

    pub fn ascent(&self) -> f32 {
        match self.family {
            Base14Family::Helvetica => 718.0,
            Base14Family::Courier => 629.0,
            Base14Family::Times => 683.0,
        }
    }

    pub fn descent(&self) -> f32 {
        match self.family {
            Base14Family::Helvetica => -207.0,
            Base14Family::Courier => -157.0,
            Base14Family::Times => -217.0,
        }
    }
}

impl TextMeasure for Base14Metrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text.chars().map(|ch| self.char_width(ch) as u32).sum();
        units as f32 * font_size / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_measures_known_strings() {
        let helv = Base14Metrics::helvetica();
        // H(722) e(556) l(222) l(222) o(556)
        assert!((helv.text_width("Hello", 10.0) - 22.78).abs() < 1e-4);
        assert_eq!(helv.text_width("", 12.0), 0.0);
        assert!((helv.text_width(" ", 1000.0) - 278.0).abs() < 1e-3);
    }

    #[test]
    fn courier_is_monospaced() {
        let courier = Base14Metrics::courier();
        assert_eq!(courier.text_width("iiii", 10.0), courier.text_width("MMMM", 10.0));
        assert!((courier.text_width("abc", 10.0) - 18.0).abs() < 1e-4);
    }

    #[test]
    fn base_font_names_resolve_families() {
        assert_eq!(
            Base14Metrics::for_base_font("ABCDEF+Courier-Bold").family(),
            Base14Family::Courier
        );
        assert_eq!(
            Base14Metrics::for_base_font("Times-Roman").family(),
            Base14Family::Times
        );
        assert_eq!(
            Base14Metrics::for_base_font("ArialMT").family(),
            Base14Family::Helvetica
        );
    }

    #[test]
    fn non_ascii_uses_missing_width() {
        let helv = Base14Metrics::helvetica();
        assert_eq!(helv.char_width('é'), HELVETICA_MISSING);
    }
}
