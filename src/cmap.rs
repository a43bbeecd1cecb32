//! Character-code to Unicode mapping for fonts that do not use a standard
//! single-byte encoding: `/ToUnicode` CMaps and `/Differences` glyph names.

use std::collections::HashMap;

#[derive(Debug)]
struct BfRange {
    first: u32,
    last: u32,
    /// UTF-16BE units of the text for `first`; the last unit steps with the code.
    base: Vec<u16>,
}

/// Parsed `bfchar`/`bfrange` entries of a ToUnicode CMap.
#[derive(Debug, Default)]
pub(crate) struct ToUnicodeMap {
    singles: HashMap<u32, String>,
    ranges: Vec<BfRange>,
}

impl ToUnicodeMap {
    pub(crate) fn parse(data: &[u8]) -> Self {
        let mut map = Self::default();
        let tokens = tokenize(data);
        let mut idx = 0;
        while idx < tokens.len() {
            match &tokens[idx] {
                Token::Keyword(word) if word == "beginbfchar" => {
                    idx = map.read_bfchar(&tokens, idx + 1);
                }
                Token::Keyword(word) if word == "beginbfrange" => {
                    idx = map.read_bfrange(&tokens, idx + 1);
                }
                _ => idx += 1,
            }
        }
        map
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.ranges.is_empty()
    }

    pub(crate) fn get(&self, code: u32) -> Option<String> {
        if let Some(text) = self.singles.get(&code) {
            return Some(text.clone());
        }
        let range = self
            .ranges
            .iter()
            .find(|range| (range.first..=range.last).contains(&code))?;
        let mut units = range.base.clone();
        let last = units.last_mut()?;
        *last = last.wrapping_add((code - range.first) as u16);
        Some(String::from_utf16_lossy(&units))
    }

    fn read_bfchar(&mut self, tokens: &[Token], mut idx: usize) -> usize {
        while let (Some(Token::Hex(src)), Some(Token::Hex(dst))) =
            (tokens.get(idx), tokens.get(idx + 1))
        {
            self.singles.insert(code_of(src), utf16_text(dst));
            idx += 2;
        }
        idx
    }

    fn read_bfrange(&mut self, tokens: &[Token], mut idx: usize) -> usize {
        while let (Some(Token::Hex(first)), Some(Token::Hex(last))) =
            (tokens.get(idx), tokens.get(idx + 1))
        {
            let (first, last) = (code_of(first), code_of(last));
            idx += 2;
            match tokens.get(idx) {
                Some(Token::Hex(dst)) => {
                    let base = utf16_units(dst);
                    if !base.is_empty() && first <= last {
                        self.ranges.push(BfRange { first, last, base });
                    }
                    idx += 1;
                }
                Some(Token::ArrayStart) => {
                    idx += 1;
                    let mut code = first;
                    while let Some(Token::Hex(dst)) = tokens.get(idx) {
                        if code <= last {
                            self.singles.insert(code, utf16_text(dst));
                        }
                        code = code.saturating_add(1);
                        idx += 1;
                    }
                    if matches!(tokens.get(idx), Some(Token::ArrayEnd)) {
                        idx += 1;
                    }
                }
                _ => break,
            }
        }
        idx
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Keyword(String),
}

fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Hex strings, array brackets and bare words; names, literal strings,
/// dictionaries and comments are dropped.
fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        match byte {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let start = i + 1;
                let end = data[start..]
                    .iter()
                    .position(|b| *b == b'>')
                    .map_or(data.len(), |p| start + p);
                tokens.push(Token::Hex(decode_hex(&data[start..end])));
                i = end + 1;
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            b'(' => {
                let mut depth = 0usize;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            b'/' => {
                i += 1;
                while i < data.len() && !data[i].is_ascii_whitespace() && !is_delimiter(data[i]) {
                    i += 1;
                }
            }
            b if b.is_ascii_whitespace() || is_delimiter(b) => i += 1,
            _ => {
                let start = i;
                while i < data.len() && !data[i].is_ascii_whitespace() && !is_delimiter(data[i]) {
                    i += 1;
                }
                tokens.push(Token::Keyword(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
        }
    }
    tokens
}

fn decode_hex(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|b| (*b as char).to_digit(16).map(|d| d as u8))
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => *single as u16,
            _ => 0,
        })
        .collect()
}

fn utf16_text(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

// Adobe Glyph List names for the ASCII range plus the typographic marks
// common in certificate templates.
const GLYPH_NAMES: [(&str, &str); 59] = [
    ("space", " "),
    ("exclam", "!"),
    ("quotedbl", "\""),
    ("numbersign", "#"),
    ("dollar", "$"),
    ("percent", "%"),
    ("ampersand", "&"),
    ("quotesingle", "'"),
    ("parenleft", "("),
    ("parenright", ")"),
    ("asterisk", "*"),
    ("plus", "+"),
    ("comma", ","),
    ("hyphen", "-"),
    ("period", "."),
    ("slash", "/"),
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("colon", ":"),
    ("semicolon", ";"),
    ("less", "<"),
    ("equal", "="),
    ("greater", ">"),
    ("question", "?"),
    ("at", "@"),
    ("bracketleft", "["),
    ("backslash", "\\"),
    ("bracketright", "]"),
    ("asciicircum", "^"),
    ("underscore", "_"),
    ("grave", "`"),
    ("braceleft", "{"),
    ("bar", "|"),
    ("braceright", "}"),
    ("asciitilde", "~"),
    ("nbspace", "\u{a0}"),
    ("quoteleft", "\u{2018}"),
    ("quoteright", "\u{2019}"),
    ("quotedblleft", "\u{201c}"),
    ("quotedblright", "\u{201d}"),
    ("endash", "\u{2013}"),
    ("emdash", "\u{2014}"),
    ("bullet", "\u{2022}"),
    ("ellipsis", "\u{2026}"),
    ("degree", "\u{b0}"),
    ("copyright", "\u{a9}"),
    ("registered", "\u{ae}"),
    ("fi", "fi"),
    ("fl", "fl"),
    ("ff", "ff"),
    ("rupee", "\u{20b9}"),
];

/// Text for a glyph name: AGL names, `uniXXXX`, `uXXXX[XX]`, single letters,
/// and `_` ligatures of those. Suffixes after `.` are ignored.
pub(crate) fn glyph_name_to_unicode(name: &str) -> Option<String> {
    let base = name.split('.').next().unwrap_or(name);
    if base.is_empty() {
        return None;
    }
    let mut out = String::new();
    for part in base.split('_') {
        out.push_str(&glyph_component(part)?);
    }
    Some(out)
}

fn glyph_component(part: &str) -> Option<String> {
    if let Some((_, text)) = GLYPH_NAMES.iter().find(|(glyph, _)| *glyph == part) {
        return Some((*text).to_string());
    }
    let mut chars = part.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_ascii_alphabetic() {
            return Some(ch.to_string());
        }
    }
    if let Some(hex) = part.strip_prefix("uni") {
        if !hex.is_empty() && hex.is_ascii() && hex.len() % 4 == 0 {
            let units = (0..hex.len())
                .step_by(4)
                .map(|at| u16::from_str_radix(&hex[at..at + 4], 16).ok())
                .collect::<Option<Vec<u16>>>()?;
            return String::from_utf16(&units).ok();
        }
    }
    if let Some(hex) = part.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            let code = u32::from_str_radix(hex, 16).ok()?;
            return char::from_u32(code).map(String::from);
        }
    }
    None
}
