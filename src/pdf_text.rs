use crate::cmap::{ToUnicodeMap, glyph_name_to_unicode};
use crate::error::{StampError, lopdf_err};
use crate::metrics::Base14Metrics;
use crate::pdf::{PageFrame, number, resolve, resolve_dict};
use crate::types::{Matrix, Rect};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LoDocument, Object as LoObject, ObjectId as LoObjectId};
use std::collections::HashMap;
use std::rc::Rc;

const MAX_FORM_DEPTH: usize = 8;

/// Characters of one visual line with one box per character, in page space
/// with a top-left origin.
#[derive(Debug, Clone)]
pub(crate) struct TextLine {
    pub text: String,
    pub boxes: Vec<Rect>,
}

impl TextLine {
    /// Boxes of every literal, non-overlapping occurrence of `needle`.
    pub(crate) fn find(&self, needle: &str) -> Vec<Rect> {
        if needle.is_empty() {
            return Vec::new();
        }
        let needle_chars = needle.chars().count();
        let mut out = Vec::new();
        for (byte_idx, _) in self.text.match_indices(needle) {
            let start = self.text[..byte_idx].chars().count();
            let Some(boxes) = self.boxes.get(start..start + needle_chars) else {
                continue;
            };
            if let Some(first) = boxes.first() {
                out.push(boxes.iter().skip(1).fold(*first, |acc, b| acc.union(*b)));
            }
        }
        out
    }
}

pub(crate) fn scan_page_text(
    doc: &LoDocument,
    content: &[u8],
    resources: &Dictionary,
    frame: PageFrame,
) -> Result<Vec<TextLine>, StampError> {
    let mut scanner = TextScanner::new(doc, frame);
    scanner.run(content, resources, 0)?;
    Ok(scanner.into_lines())
}

// WinAnsiEncoding code points that differ from Latin-1.
pub(crate) const WINANSI_SPECIALS: [(u8, char); 27] = [
    (0x80, '€'),
    (0x82, '‚'),
    (0x83, 'ƒ'),
    (0x84, '„'),
    (0x85, '…'),
    (0x86, '†'),
    (0x87, '‡'),
    (0x88, 'ˆ'),
    (0x89, '‰'),
    (0x8a, 'Š'),
    (0x8b, '‹'),
    (0x8c, 'Œ'),
    (0x8e, 'Ž'),
    (0x91, '‘'),
    (0x92, '’'),
    (0x93, '“'),
    (0x94, '”'),
    (0x95, '•'),
    (0x96, '–'),
    (0x97, '—'),
    (0x98, '˜'),
    (0x99, '™'),
    (0x9a, 'š'),
    (0x9b, '›'),
    (0x9c, 'œ'),
    (0x9e, 'ž'),
    (0x9f, 'Ÿ'),
];

fn winansi_char(byte: u8) -> char {
    if (0x80..0xa0).contains(&byte) {
        return WINANSI_SPECIALS
            .iter()
            .find(|(code, _)| *code == byte)
            .map(|(_, ch)| *ch)
            .unwrap_or('\u{fffd}');
    }
    byte as char
}

#[derive(Debug)]
struct FontInfo {
    first_char: u32,
    widths: Vec<f32>,
    missing_width: Option<f32>,
    default_width: f32,
    cid_widths: HashMap<u32, f32>,
    to_unicode: Option<ToUnicodeMap>,
    differences: HashMap<u32, String>,
    fallback: Base14Metrics,
    ascent: f32,
    descent: f32,
    two_byte: bool,
}

impl FontInfo {
    fn from_dict(doc: &LoDocument, font: &Dictionary) -> Self {
        let base_font = match font.get(b"BaseFont") {
            Ok(LoObject::Name(name)) => String::from_utf8_lossy(name).into_owned(),
            _ => String::new(),
        };
        let fallback = Base14Metrics::for_base_font(&base_font);
        let two_byte =
            matches!(font.get(b"Subtype"), Ok(LoObject::Name(name)) if name == b"Type0");

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(number)
            .map(|v| v.max(0.0) as u32)
            .unwrap_or(0);
        let widths = match font.get(b"Widths").map(|obj| resolve(doc, obj)) {
            Ok(LoObject::Array(items)) => items
                .iter()
                .map(|item| number(resolve(doc, item)).unwrap_or(0.0))
                .collect(),
            _ => Vec::new(),
        };

        let descriptor_source = if two_byte {
            match font.get(b"DescendantFonts").map(|obj| resolve(doc, obj)) {
                Ok(LoObject::Array(items)) => {
                    items.first().and_then(|item| resolve_dict(doc, item))
                }
                _ => None,
            }
        } else {
            Some(font)
        };
        let default_width = descriptor_source
            .and_then(|d| d.get(b"DW").ok())
            .and_then(number)
            .unwrap_or(1000.0);
        let cid_widths = match descriptor_source.and_then(|d| d.get(b"W").ok()) {
            Some(obj) if two_byte => cid_widths(doc, resolve(doc, obj)),
            _ => HashMap::new(),
        };
        let descriptor = descriptor_source
            .and_then(|d| d.get(b"FontDescriptor").ok())
            .and_then(|obj| resolve_dict(doc, obj));
        let read = |key: &[u8]| descriptor.and_then(|d| d.get(key).ok()).and_then(number);
        let missing_width = read(b"MissingWidth").filter(|w| *w > 0.0);
        let (ascent, descent) = match (read(b"Ascent"), read(b"Descent")) {
            (Some(ascent), Some(descent)) if ascent > descent => (ascent, descent),
            _ => (fallback.ascent(), fallback.descent()),
        };

        let to_unicode = match font.get(b"ToUnicode").map(|obj| resolve(doc, obj)) {
            Ok(LoObject::Stream(stream)) => {
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                Some(ToUnicodeMap::parse(&data)).filter(|map| !map.is_empty())
            }
            _ => None,
        };
        let encoding = font
            .get(b"Encoding")
            .ok()
            .and_then(|obj| resolve_dict(doc, obj));
        let differences = match encoding {
            Some(encoding) if !two_byte => encoding_differences(doc, encoding),
            _ => HashMap::new(),
        };

        Self {
            first_char,
            widths,
            missing_width,
            default_width,
            cid_widths,
            to_unicode,
            differences,
            fallback,
            ascent,
            descent,
            two_byte,
        }
    }

    /// Splits shown bytes into character codes and the text each one draws.
    /// ToUnicode wins over `/Differences`, which wins over the built-in
    /// encoding. A code may draw more than one character.
    fn decode(&self, bytes: &[u8]) -> Vec<(u32, String)> {
        let codes: Vec<u32> = if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| pair.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
                .collect()
        } else {
            bytes.iter().map(|b| *b as u32).collect()
        };
        codes
            .into_iter()
            .map(|code| {
                let mapped = self
                    .to_unicode
                    .as_ref()
                    .and_then(|map| map.get(code))
                    .or_else(|| self.differences.get(&code).cloned());
                let text = match mapped {
                    Some(text) => text,
                    None if self.two_byte => {
                        char::from_u32(code).unwrap_or('\u{fffd}').to_string()
                    }
                    None => winansi_char(code as u8).to_string(),
                };
                (code, text)
            })
            .collect()
    }

    /// Advance in 1/1000 text-space units.
    fn width(&self, code: u32, text: &str) -> f32 {
        if self.two_byte {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_width);
        }
        if let Some(idx) = code.checked_sub(self.first_char) {
            if let Some(width) = self.widths.get(idx as usize) {
                return *width;
            }
        }
        if let Some(width) = self.missing_width {
            return width;
        }
        text.chars()
            .map(|ch| self.fallback.char_width(ch) as f32)
            .sum()
    }
}

/// `/W` array of a CIDFont: `c [w1 w2 ...]` and `c_first c_last w` entries.
/// Codes are taken as CIDs, which holds for Identity encodings.
fn cid_widths(doc: &LoDocument, w: &LoObject) -> HashMap<u32, f32> {
    let mut out = HashMap::new();
    let LoObject::Array(items) = w else {
        return out;
    };
    let mut idx = 0;
    while idx < items.len() {
        let Some(first) = number(resolve(doc, &items[idx])) else {
            break;
        };
        let first = first.max(0.0) as u32;
        match items.get(idx + 1).map(|obj| resolve(doc, obj)) {
            Some(LoObject::Array(run)) => {
                for (offset, width) in run.iter().enumerate() {
                    if let Some(width) = number(resolve(doc, width)) {
                        out.insert(first + offset as u32, width);
                    }
                }
                idx += 2;
            }
            Some(last) => {
                let (Some(last), Some(width)) = (
                    number(last),
                    items.get(idx + 2).and_then(|obj| number(resolve(doc, obj))),
                ) else {
                    break;
                };
                for code in first..=last.max(0.0) as u32 {
                    out.insert(code, width);
                }
                idx += 3;
            }
            None => break,
        }
    }
    out
}

/// Codes remapped by an encoding dictionary's `/Differences` array.
fn encoding_differences(doc: &LoDocument, encoding: &Dictionary) -> HashMap<u32, String> {
    let mut out = HashMap::new();
    let Ok(LoObject::Array(items)) = encoding.get(b"Differences").map(|obj| resolve(doc, obj))
    else {
        return out;
    };
    let mut code = 0u32;
    for item in items {
        match resolve(doc, item) {
            LoObject::Name(name) => {
                if let Some(text) = glyph_name_to_unicode(&String::from_utf8_lossy(name)) {
                    out.insert(code, text);
                }
                code += 1;
            }
            other => {
                if let Some(start) = number(other) {
                    code = start.max(0.0) as u32;
                }
            }
        }
    }
    out
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Rc<FontInfo>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    h_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug)]
struct Run {
    chars: Vec<(char, Rect)>,
    start: (f32, f32),
    end: (f32, f32),
    size: f32,
}

struct TextScanner<'a> {
    doc: &'a LoDocument,
    frame: PageFrame,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    runs: Vec<Run>,
    fonts: HashMap<LoObjectId, Rc<FontInfo>>,
}

impl<'a> TextScanner<'a> {
    fn new(doc: &'a LoDocument, frame: PageFrame) -> Self {
        Self {
            doc,
            frame,
            state: GraphicsState::default(),
            stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            runs: Vec::new(),
            fonts: HashMap::new(),
        }
    }

    fn run(
        &mut self,
        content: &[u8],
        resources: &Dictionary,
        depth: usize,
    ) -> Result<(), StampError> {
        let content = Content::decode(content).map_err(lopdf_err)?;
        for op in &content.operations {
            self.apply(op, resources, depth)?;
        }
        Ok(())
    }

    fn apply(
        &mut self,
        op: &Operation,
        resources: &Dictionary,
        depth: usize,
    ) -> Result<(), StampError> {
        let num = |idx: usize| op.operands.get(idx).and_then(number).unwrap_or(0.0);
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                let m = Matrix::new(num(0), num(1), num(2), num(3), num(4), num(5));
                self.state.ctm = m.then(self.state.ctm);
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(LoObject::Name(name)) = op.operands.first() {
                    self.state.font = self.load_font(resources, name);
                }
                self.state.font_size = num(1);
            }
            "Tc" => self.state.char_spacing = num(0),
            "Tw" => self.state.word_spacing = num(0),
            "Tz" => self.state.h_scale = num(0) / 100.0,
            "TL" => self.state.leading = num(0),
            "Ts" => self.state.rise = num(0),
            "Td" => self.move_line(num(0), num(1)),
            "TD" => {
                self.state.leading = -num(1);
                self.move_line(num(0), num(1));
            }
            "Tm" => {
                self.tlm = Matrix::new(num(0), num(1), num(2), num(3), num(4), num(5));
                self.tm = self.tlm;
            }
            "T*" => self.move_line(0.0, -self.state.leading),
            "Tj" => {
                if let Some(LoObject::String(bytes, _)) = op.operands.first() {
                    let mut run = self.begin_run();
                    self.show(&mut run, bytes);
                    self.end_run(run);
                }
            }
            "'" => {
                self.move_line(0.0, -self.state.leading);
                if let Some(LoObject::String(bytes, _)) = op.operands.first() {
                    let mut run = self.begin_run();
                    self.show(&mut run, bytes);
                    self.end_run(run);
                }
            }
            "\"" => {
                self.state.word_spacing = num(0);
                self.state.char_spacing = num(1);
                self.move_line(0.0, -self.state.leading);
                if let Some(LoObject::String(bytes, _)) = op.operands.get(2) {
                    let mut run = self.begin_run();
                    self.show(&mut run, bytes);
                    self.end_run(run);
                }
            }
            "TJ" => {
                if let Some(LoObject::Array(items)) = op.operands.first() {
                    let mut run = self.begin_run();
                    for item in items {
                        match item {
                            LoObject::String(bytes, _) => self.show(&mut run, bytes),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let tx = -adjust / 1000.0
                                        * self.state.font_size
                                        * self.state.h_scale;
                                    self.tm = Matrix::translate(tx, 0.0).then(self.tm);
                                }
                            }
                        }
                    }
                    self.end_run(run);
                }
            }
            "Do" => {
                if depth < MAX_FORM_DEPTH {
                    if let Some(LoObject::Name(name)) = op.operands.first() {
                        self.draw_form(resources, name, depth)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translate(tx, ty).then(self.tlm);
        self.tm = self.tlm;
    }

    fn load_font(&mut self, resources: &Dictionary, name: &[u8]) -> Option<Rc<FontInfo>> {
        let doc = self.doc;
        let fonts = resources.get(b"Font").ok().and_then(|obj| resolve_dict(doc, obj))?;
        let entry = fonts.get(name).ok()?;
        if let LoObject::Reference(id) = entry {
            if let Some(font) = self.fonts.get(id) {
                return Some(font.clone());
            }
            let font = Rc::new(FontInfo::from_dict(doc, resolve_dict(doc, entry)?));
            self.fonts.insert(*id, font.clone());
            return Some(font);
        }
        Some(Rc::new(FontInfo::from_dict(doc, resolve_dict(doc, entry)?)))
    }

    fn draw_form(
        &mut self,
        resources: &Dictionary,
        name: &[u8],
        depth: usize,
    ) -> Result<(), StampError> {
        let doc = self.doc;
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
        else {
            return Ok(());
        };
        let Ok(entry) = xobjects.get(name) else {
            return Ok(());
        };
        let LoObject::Stream(stream) = resolve(doc, entry) else {
            return Ok(());
        };
        if !matches!(stream.dict.get(b"Subtype"), Ok(LoObject::Name(sub)) if sub == b"Form") {
            return Ok(());
        }
        let content = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let matrix = match stream.dict.get(b"Matrix").map(|obj| resolve(doc, obj)) {
            Ok(LoObject::Array(items)) if items.len() == 6 => {
                let v: Vec<f32> = items.iter().map(|i| number(i).unwrap_or(0.0)).collect();
                Matrix::new(v[0], v[1], v[2], v[3], v[4], v[5])
            }
            _ => Matrix::IDENTITY,
        };
        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
            .unwrap_or(resources);

        self.stack.push(self.state.clone());
        let (saved_tm, saved_tlm) = (self.tm, self.tlm);
        self.state.ctm = matrix.then(self.state.ctm);
        let result = self.run(&content, form_resources, depth + 1);
        self.tm = saved_tm;
        self.tlm = saved_tlm;
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
        result
    }

    fn render_matrix(&self) -> Matrix {
        let s = &self.state;
        Matrix::new(s.font_size * s.h_scale, 0.0, 0.0, s.font_size, 0.0, s.rise)
            .then(self.tm)
            .then(s.ctm)
    }

    fn begin_run(&self) -> Run {
        let trm = self.render_matrix();
        let origin = trm.apply(0.0, 0.0);
        Run {
            chars: Vec::new(),
            start: origin,
            end: origin,
            size: trm.vertical_extent(),
        }
    }

    fn end_run(&mut self, mut run: Run) {
        run.end = self.render_matrix().apply(0.0, 0.0);
        if !run.chars.is_empty() {
            self.runs.push(run);
        }
    }

    fn show(&mut self, run: &mut Run, bytes: &[u8]) {
        let Some(font) = self.state.font.clone() else {
            return;
        };
        for (code, text) in font.decode(bytes) {
            let w0 = font.width(code, &text) / 1000.0;
            let trm = self.render_matrix();
            // Multi-character codes share the glyph advance evenly.
            let parts = text.chars().count().max(1) as f32;
            for (i, ch) in text.chars().enumerate() {
                let (left, right) = (w0 * i as f32 / parts, w0 * (i + 1) as f32 / parts);
                let corners = [
                    trm.apply(left, font.descent / 1000.0),
                    trm.apply(right, font.descent / 1000.0),
                    trm.apply(left, font.ascent / 1000.0),
                    trm.apply(right, font.ascent / 1000.0),
                ];
                run.chars.push((ch, self.to_page_rect(&corners)));
            }

            let word_spacing = if !font.two_byte && code == 32 {
                self.state.word_spacing
            } else {
                0.0
            };
            let tx = (w0 * self.state.font_size + self.state.char_spacing + word_spacing)
                * self.state.h_scale;
            self.tm = Matrix::translate(tx, 0.0).then(self.tm);
        }
    }

    fn to_page_rect(&self, corners: &[(f32, f32)]) -> Rect {
        let mut rect = Rect::new(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for (x, y) in corners {
            let (px, py) = self.frame.to_top_left(*x, *y);
            rect = Rect::new(
                rect.x0.min(px),
                rect.y0.min(py),
                rect.x1.max(px),
                rect.y1.max(py),
            );
        }
        rect
    }

    /// Joins runs that continue on the same baseline without a visible gap.
    fn into_lines(self) -> Vec<TextLine> {
        let mut lines: Vec<TextLine> = Vec::new();
        let mut last: Option<&Run> = None;
        for run in &self.runs {
            let continues = last.is_some_and(|prev| {
                let size = prev.size.min(run.size).max(0.01);
                (run.start.1 - prev.end.1).abs() <= 0.5 * size
                    && run.start.0 - prev.end.0 >= -0.5 * size
                    && run.start.0 - prev.end.0 <= 0.25 * size
            });
            match lines.last_mut() {
                Some(line) if continues => {
                    for (ch, rect) in &run.chars {
                        line.text.push(*ch);
                        line.boxes.push(*rect);
                    }
                }
                _ => lines.push(TextLine {
                    text: run.chars.iter().map(|(ch, _)| *ch).collect(),
                    boxes: run.chars.iter().map(|(_, rect)| *rect).collect(),
                }),
            }
            last = Some(run);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::TemplatePdf;
    use crate::testutil::{PageSpec, build_pdf_bytes};

    fn lines_of(pages: &[PageSpec], page: usize) -> Vec<TextLine> {
        let pdf = TemplatePdf::from_bytes(&build_pdf_bytes(pages)).expect("open");
        pdf.page_lines(page).expect("scan").to_vec()
    }

    #[test]
    fn unit_width_font_yields_exact_boxes() {
        // F2: every glyph 1000 units wide, ascent 800, descent -200.
        let lines = lines_of(&[PageSpec::raw("BT /F2 10 Tf 100 684 Td (#Name) Tj ET")], 0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "#Name");
        let found = lines[0].find("#Name");
        assert_eq!(found.len(), 1);
        let rect = found[0];
        assert!((rect.x0 - 100.0).abs() < 1e-3);
        assert!((rect.x1 - 150.0).abs() < 1e-3);
        assert!((rect.y0 - 100.0).abs() < 1e-3);
        assert!((rect.y1 - 110.0).abs() < 1e-3);
    }

    #[test]
    fn separate_lines_are_not_joined() {
        let lines = lines_of(
            &[PageSpec::raw(
                "BT /F1 12 Tf 72 720 Td (First) Tj 0 -20 Td (Second) Tj ET",
            )],
            0,
        );
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["First", "Second"]);
    }

    #[test]
    fn adjacent_runs_on_one_baseline_form_one_line() {
        let lines = lines_of(&[PageSpec::raw("BT /F1 12 Tf 72 720 Td (#Na) Tj (me) Tj ET")], 0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "#Name");
        assert_eq!(lines[0].boxes.len(), 5);
    }

    #[test]
    fn tj_arrays_apply_kerning_inside_one_run() {
        let lines = lines_of(&[PageSpec::raw("BT /F2 10 Tf 0 692 Td [(AB) -1000 (C)] TJ ET")], 0);
        assert_eq!(lines[0].text, "ABC");
        // -1000 moves C right by one em (10 units) beyond the 20 of AB.
        assert!((lines[0].boxes[2].x0 - 30.0).abs() < 1e-3);
    }

    #[test]
    fn form_xobject_text_is_scanned_with_its_matrix() {
        let lines = lines_of(
            &[PageSpec::with_form(
                "BT /F2 10 Tf 0 0 Td (#Sig) Tj ET",
                [1.0, 0.0, 0.0, 1.0, 50.0, 92.0],
            )],
            0,
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "#Sig");
        let rect = lines[0].find("#Sig")[0];
        assert!((rect.x0 - 50.0).abs() < 1e-3);
        // Baseline at pdf y=92 on a 792pt page is 700 from the top.
        assert!((rect.y0 - 692.0).abs() < 1e-3);
    }

    #[test]
    fn type0_text_decodes_through_to_unicode_with_cid_widths() {
        let lines = lines_of(
            &[PageSpec::raw("BT /F3 10 Tf 100 684 Td <00010002000300040005> Tj ET")],
            0,
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "#Name");
        let rect = lines[0].find("#Name")[0];
        // `/W` gives 500 units per CID, half the 1000 `DW`.
        assert!((rect.x0 - 100.0).abs() < 1e-3);
        assert!((rect.x1 - 125.0).abs() < 1e-3);
        assert!((rect.y0 - 100.0).abs() < 1e-3);
        assert!((rect.y1 - 110.0).abs() < 1e-3);
    }

    #[test]
    fn multi_character_code_shares_its_advance() {
        // <0006> maps to "Image" and falls back to the 1000 unit `DW`.
        let lines = lines_of(&[PageSpec::raw("BT /F3 10 Tf 100 684 Td <00010006> Tj ET")], 0);
        assert_eq!(lines[0].text, "#Image");
        assert_eq!(lines[0].boxes.len(), 6);
        assert!((lines[0].boxes[1].x0 - 105.0).abs() < 1e-3);
        assert!((lines[0].boxes[2].x0 - 107.0).abs() < 1e-3);
        let rect = lines[0].find("#Image")[0];
        assert!((rect.x1 - 115.0).abs() < 1e-3);
    }

    #[test]
    fn differences_encoding_maps_codes_through_glyph_names() {
        let lines = lines_of(&[PageSpec::raw("BT /F4 10 Tf 100 684 Td <0102030405> Tj ET")], 0);
        assert_eq!(lines[0].text, "#Name");
        let rect = lines[0].find("#Name")[0];
        assert!((rect.x1 - 150.0).abs() < 1e-3);
    }

    #[test]
    fn find_reports_every_occurrence_in_order() {
        let line = TextLine {
            text: "#A and #A".to_string(),
            boxes: (0..9)
                .map(|i| Rect::new(i as f32, 0.0, i as f32 + 1.0, 1.0))
                .collect(),
        };
        let found = line.find("#A");
        assert_eq!(found, vec![Rect::new(0.0, 0.0, 2.0, 1.0), Rect::new(7.0, 0.0, 9.0, 1.0)]);
        assert!(line.find("").is_empty());
    }

    #[test]
    fn winansi_specials_decode() {
        assert_eq!(winansi_char(0x93), '“');
        assert_eq!(winansi_char(b'A'), 'A');
        assert_eq!(winansi_char(0xe9), 'é');
        assert_eq!(winansi_char(0x81), '\u{fffd}');
    }
}
