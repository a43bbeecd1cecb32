use crate::compose::OverlaySurface;
use crate::error::{StampError, lopdf_err};
use crate::inspect::{load_template_bytes, read_template};
use crate::locate::TextSearch;
use crate::pdf_text::{TextLine, WINANSI_SPECIALS, scan_page_text};
use crate::types::{Color, Point, Rect};
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{
    Dictionary, Document as LoDocument, Object as LoObject, ObjectId as LoObjectId,
    Stream as LoStream, StringFormat, dictionary,
};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

const STAMP_FONT_NAME: &str = "FStamp";
const STAMP_IMAGE_PREFIX: &str = "ImStamp";
const MAX_INHERIT_DEPTH: usize = 32;

/// Visible page box. Converts between PDF user space (bottom-left origin) and
/// the top-left page space used by rectangles and anchors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PageFrame {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl PageFrame {
    const LETTER: PageFrame = PageFrame {
        left: 0.0,
        bottom: 0.0,
        right: 612.0,
        top: 792.0,
    };

    fn from_box(values: &[LoObject]) -> Option<Self> {
        if values.len() != 4 {
            return None;
        }
        let v: Vec<f32> = values.iter().filter_map(number).collect();
        if v.len() != 4 {
            return None;
        }
        Some(Self {
            left: v[0].min(v[2]),
            bottom: v[1].min(v[3]),
            right: v[0].max(v[2]),
            top: v[1].max(v[3]),
        })
    }

    pub fn to_top_left(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.left, self.top - y)
    }

    pub fn to_user_space(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.left, self.top - y)
    }
}

pub(crate) fn number(obj: &LoObject) -> Option<f32> {
    match obj {
        LoObject::Integer(v) => Some(*v as f32),
        LoObject::Real(v) => Some(*v as f32),
        _ => None,
    }
}

/// Follows indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a LoDocument, obj: &'a LoObject) -> &'a LoObject {
    let mut current = obj;
    for _ in 0..MAX_INHERIT_DEPTH {
        match current {
            LoObject::Reference(id) => match doc.get_object(*id) {
                Ok(next) => current = next,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

pub(crate) fn resolve_dict<'a>(doc: &'a LoDocument, obj: &'a LoObject) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        LoObject::Dictionary(dict) => Some(dict),
        LoObject::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Page attribute lookup that honours inheritance through `/Parent`.
fn inherited<'a>(doc: &'a LoDocument, page_id: LoObjectId, key: &[u8]) -> Option<&'a LoObject> {
    let mut node = doc.get_object(page_id).ok().and_then(|obj| resolve_dict(doc, obj))?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = node.get(b"Parent").ok()?;
        node = resolve_dict(doc, parent)?;
    }
    None
}

fn page_frame(doc: &LoDocument, page_id: LoObjectId) -> PageFrame {
    for key in [b"CropBox".as_slice(), b"MediaBox".as_slice()] {
        if let Some(LoObject::Array(values)) = inherited(doc, page_id, key) {
            if let Some(frame) = PageFrame::from_box(values) {
                return frame;
            }
        }
    }
    PageFrame::LETTER
}

fn page_resources(doc: &LoDocument, page_id: LoObjectId) -> Dictionary {
    inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dict(doc, obj))
        .cloned()
        .unwrap_or_default()
}

fn resource_category(doc: &LoDocument, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .cloned()
        .unwrap_or_default()
}

fn unused_name(dict: &Dictionary, base: &str) -> String {
    if !dict.has(base.as_bytes()) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !dict.has(candidate.as_bytes()))
        .unwrap_or_else(|| base.to_string())
}

/// WinAnsi bytes for the standard Helvetica font; unrepresentable characters
/// become `?` and control characters become spaces.
pub(crate) fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| {
            let code = ch as u32;
            if code < 0x20 || code == 0x7f {
                b' '
            } else if code < 0x80 || (0xa0..=0xff).contains(&code) {
                code as u8
            } else {
                WINANSI_SPECIALS
                    .iter()
                    .find(|(_, special)| *special == ch)
                    .map(|(byte, _)| *byte)
                    .unwrap_or(b'?')
            }
        })
        .collect()
}

fn flate_compress(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

#[derive(Debug, Clone)]
enum OverlayItem {
    Text {
        origin: Point,
        text: String,
        font_size: f32,
        color: Color,
    },
    Image {
        rect: Rect,
        xobject: LoObjectId,
    },
}

/// A loaded template. Text can be searched, overlays queued, and the result
/// written out as a new file; the source file is never touched.
pub struct TemplatePdf {
    doc: LoDocument,
    page_ids: Vec<LoObjectId>,
    frames: Vec<PageFrame>,
    text: Vec<OnceCell<Vec<TextLine>>>,
    overlays: BTreeMap<usize, Vec<OverlayItem>>,
}

impl TemplatePdf {
    pub fn open(path: &Path) -> Result<Self, StampError> {
        let bytes = read_template(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StampError> {
        let doc = load_template_bytes(bytes)?;
        let page_ids: Vec<LoObjectId> = doc.get_pages().values().copied().collect();
        let frames = page_ids.iter().map(|id| page_frame(&doc, *id)).collect();
        let text = page_ids.iter().map(|_| OnceCell::new()).collect();
        Ok(Self {
            doc,
            page_ids,
            frames,
            text,
            overlays: BTreeMap::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn check_page(&self, page: usize) -> Result<(), StampError> {
        if page >= self.page_ids.len() {
            return Err(StampError::InvalidConfiguration(format!(
                "page index out of range: {} (allowed 0..{})",
                page,
                self.page_ids.len().saturating_sub(1)
            )));
        }
        Ok(())
    }

    pub(crate) fn page_lines(&self, page: usize) -> Result<&[TextLine], StampError> {
        self.check_page(page)?;
        let cell = &self.text[page];
        if let Some(lines) = cell.get() {
            return Ok(lines);
        }
        let page_id = self.page_ids[page];
        let content = self.doc.get_page_content(page_id).map_err(lopdf_err)?;
        let resources = page_resources(&self.doc, page_id);
        let lines = scan_page_text(&self.doc, &content, &resources, self.frames[page])?;
        Ok(cell.get_or_init(|| lines))
    }

    fn image_xobject(&mut self, image: &RgbaImage) -> LoObjectId {
        let (width, height) = image.dimensions();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        let mut has_alpha = false;
        for pixel in image.pixels() {
            let [r, g, b, a] = pixel.0;
            if a != 255 {
                has_alpha = true;
            }
            rgb.extend_from_slice(&[r, g, b]);
            alpha.push(a);
        }

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        if has_alpha {
            let smask_id = self.doc.add_object(LoStream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(width),
                    "Height" => i64::from(height),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                flate_compress(&alpha),
            ));
            dict.set("SMask", LoObject::Reference(smask_id));
        }
        self.doc
            .add_object(LoStream::new(dict, flate_compress(&rgb)))
    }

    fn apply_overlays(&mut self) -> Result<(), StampError> {
        let overlays = std::mem::take(&mut self.overlays);
        let needs_font = overlays
            .values()
            .flatten()
            .any(|item| matches!(item, OverlayItem::Text { .. }));
        let font_id = needs_font.then(|| {
            self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })
        });

        for (page, items) in overlays {
            let page_id = self.page_ids[page];
            let frame = self.frames[page];
            let mut resources = page_resources(&self.doc, page_id);
            let mut fonts = resource_category(&self.doc, &resources, b"Font");
            let mut xobjects = resource_category(&self.doc, &resources, b"XObject");
            let font_name = unused_name(&fonts, STAMP_FONT_NAME);

            let mut operations = Vec::new();
            let mut uses_font = false;
            let mut uses_images = false;
            for item in items {
                match item {
                    OverlayItem::Text {
                        origin,
                        text,
                        font_size,
                        color,
                    } => {
                        uses_font = true;
                        let (x, y) = frame.to_user_space(origin.x, origin.y);
                        operations.extend([
                            Operation::new("BT", vec![]),
                            Operation::new(
                                "Tf",
                                vec![
                                    LoObject::Name(font_name.clone().into_bytes()),
                                    LoObject::from(font_size),
                                ],
                            ),
                            Operation::new(
                                "rg",
                                vec![
                                    LoObject::from(color.r),
                                    LoObject::from(color.g),
                                    LoObject::from(color.b),
                                ],
                            ),
                            Operation::new(
                                "Tm",
                                vec![
                                    LoObject::Integer(1),
                                    LoObject::Integer(0),
                                    LoObject::Integer(0),
                                    LoObject::Integer(1),
                                    LoObject::from(x),
                                    LoObject::from(y),
                                ],
                            ),
                            Operation::new(
                                "Tj",
                                vec![LoObject::String(
                                    encode_winansi(&text),
                                    StringFormat::Literal,
                                )],
                            ),
                            Operation::new("ET", vec![]),
                        ]);
                    }
                    OverlayItem::Image { rect, xobject } => {
                        uses_images = true;
                        let name = unused_name(&xobjects, STAMP_IMAGE_PREFIX);
                        xobjects.set(name.clone(), LoObject::Reference(xobject));
                        // Image space is the unit square; scale it to the slot.
                        let (x, y) = frame.to_user_space(rect.x0, rect.y1);
                        operations.extend([
                            Operation::new("q", vec![]),
                            Operation::new(
                                "cm",
                                vec![
                                    LoObject::from(rect.width()),
                                    LoObject::Integer(0),
                                    LoObject::Integer(0),
                                    LoObject::from(rect.height()),
                                    LoObject::from(x),
                                    LoObject::from(y),
                                ],
                            ),
                            Operation::new("Do", vec![LoObject::Name(name.into_bytes())]),
                            Operation::new("Q", vec![]),
                        ]);
                    }
                }
            }

            if let (true, Some(font_id)) = (uses_font, font_id) {
                fonts.set(font_name, LoObject::Reference(font_id));
                resources.set("Font", LoObject::Dictionary(fonts));
            }
            if uses_images {
                resources.set("XObject", LoObject::Dictionary(xobjects));
            }

            let original = self.doc.get_page_content(page_id).map_err(lopdf_err)?;
            let overlay = Content { operations }.encode().map_err(lopdf_err)?;
            // Isolate the template's graphics state so nothing it leaves on
            // the stack moves the overlay.
            let mut content = Vec::with_capacity(original.len() + overlay.len() + 8);
            content.extend_from_slice(b"q\n");
            content.extend_from_slice(&original);
            content.extend_from_slice(b"\nQ\n");
            content.extend_from_slice(&overlay);
            let content_id = self.doc.add_object(LoStream::new(dictionary! {}, content));

            let page_mut = self
                .doc
                .get_object_mut(page_id)
                .and_then(LoObject::as_dict_mut)
                .map_err(lopdf_err)?;
            page_mut.set("Contents", LoObject::Reference(content_id));
            page_mut.set("Resources", LoObject::Dictionary(resources));
        }
        Ok(())
    }

    pub fn into_bytes(mut self) -> Result<Vec<u8>, StampError> {
        self.apply_overlays()?;
        self.doc.prune_objects();
        self.doc.renumber_objects();
        self.doc.compress();
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|err| StampError::Pdf(err.to_string()))?;
        Ok(out)
    }

    pub fn save(self, path: &Path) -> Result<(), StampError> {
        let bytes = self.into_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl TextSearch for TemplatePdf {
    fn page_count(&self) -> usize {
        TemplatePdf::page_count(self)
    }

    fn page_text(&self, page: usize) -> Result<String, StampError> {
        let lines = self.page_lines(page)?;
        Ok(lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn search_for(&self, page: usize, needle: &str) -> Result<Vec<Rect>, StampError> {
        let lines = self.page_lines(page)?;
        Ok(lines.iter().flat_map(|line| line.find(needle)).collect())
    }
}

impl OverlaySurface for TemplatePdf {
    fn page_count(&self) -> usize {
        TemplatePdf::page_count(self)
    }

    fn insert_text(
        &mut self,
        page: usize,
        origin: Point,
        text: &str,
        font_size: f32,
        color: Color,
    ) -> Result<(), StampError> {
        self.check_page(page)?;
        self.overlays.entry(page).or_default().push(OverlayItem::Text {
            origin,
            text: text.to_string(),
            font_size,
            color,
        });
        Ok(())
    }

    fn insert_image(
        &mut self,
        page: usize,
        rect: Rect,
        image: &RgbaImage,
    ) -> Result<(), StampError> {
        self.check_page(page)?;
        let xobject = self.image_xobject(image);
        self.overlays
            .entry(page)
            .or_default()
            .push(OverlayItem::Image { rect, xobject });
        Ok(())
    }
}
