use crate::error::StampError;
use crate::fetch::ImageSource;
use crate::locate::PositionIndex;
use crate::metrics::Base14Metrics;
use crate::pdf::TemplatePdf;
use crate::types::{Color, Point, Rect, RectKey, Size};
use crate::wrap::wrap_text;
use image::RgbaImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Token → value for one record.
pub type ReplacementMap = BTreeMap<String, String>;

/// Write side of a paged document. Coordinates are page space with a top-left
/// origin; `origin` of a text insertion is the baseline start.
pub trait OverlaySurface {
    fn page_count(&self) -> usize;
    fn insert_text(
        &mut self,
        page: usize,
        origin: Point,
        text: &str,
        font_size: f32,
        color: Color,
    ) -> Result<(), StampError>;
    fn insert_image(
        &mut self,
        page: usize,
        rect: Rect,
        image: &RgbaImage,
    ) -> Result<(), StampError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePlacement {
    /// Only the first slot on each image page.
    First,
    Every,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComposeOptions {
    pub image_token: String,
    pub wrapped_tokens: Vec<String>,
    pub wrap_width: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub text_color: Color,
    pub image_size: Size,
    /// Zero-based pages that may receive the image.
    pub image_pages: Vec<usize>,
    pub image_placement: ImagePlacement,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            image_token: "#Image".to_string(),
            wrapped_tokens: vec!["#Opinion".to_string(), "#MdOpinion".to_string()],
            wrap_width: 480.0,
            font_size: 12.0,
            line_height: 15.0,
            text_color: Color::BLACK,
            image_size: Size::new(118.0, 165.0),
            image_pages: vec![1],
            image_placement: ImagePlacement::First,
        }
    }
}

impl ComposeOptions {
    pub fn with_image_token(mut self, token: impl Into<String>) -> Self {
        self.image_token = token.into();
        self
    }

    pub fn with_wrapped_tokens<I, T>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.wrapped_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_wrap_width(mut self, width: f32) -> Self {
        self.wrap_width = width;
        self
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height;
        self
    }

    pub fn with_image_size(mut self, size: Size) -> Self {
        self.image_size = size;
        self
    }

    pub fn with_image_pages(mut self, pages: Vec<usize>) -> Self {
        self.image_pages = pages;
        self
    }

    pub fn with_image_placement(mut self, placement: ImagePlacement) -> Self {
        self.image_placement = placement;
        self
    }

    pub fn validate(&self) -> Result<(), StampError> {
        let positive = [
            ("wrap_width", self.wrap_width),
            ("font_size", self.font_size),
            ("image_size.width", self.image_size.width),
            ("image_size.height", self.image_size.height),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(StampError::InvalidConfiguration(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if !self.line_height.is_finite() {
            return Err(StampError::InvalidConfiguration(
                "line_height must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn is_wrapped(&self, token: &str) -> bool {
        self.wrapped_tokens.iter().any(|wrapped| wrapped == token)
    }

    fn pixel_size(&self) -> (u32, u32) {
        (
            self.image_size.width.round().max(1.0) as u32,
            self.image_size.height.round().max(1.0) as u32,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComposeSummary {
    pub text_insertions: usize,
    pub image_insertions: usize,
    /// An image was due but the fetch produced nothing.
    pub image_missing: bool,
}

/// Lazily fetched, already resized photo for one record.
enum Photo {
    Pending,
    Ready(RgbaImage),
    Missing,
}

struct Composer<'a> {
    replacements: &'a ReplacementMap,
    index: &'a PositionIndex,
    options: &'a ComposeOptions,
    images: &'a dyn ImageSource,
    metrics: Base14Metrics,
    photo: Photo,
    summary: ComposeSummary,
}

impl<'a> Composer<'a> {
    fn place_text<S: OverlaySurface + ?Sized>(
        &mut self,
        surface: &mut S,
        page: usize,
    ) -> Result<(), StampError> {
        let (index, options, replacements) = (self.index, self.options, self.replacements);
        for token in index.tokens() {
            if token == options.image_token {
                continue;
            }
            let Some(value) = replacements.get(token) else {
                continue;
            };
            let mut consumed: BTreeSet<RectKey> = BTreeSet::new();
            for rect in index.rects_on_page(token, page) {
                if !consumed.insert(rect.key()) {
                    continue;
                }
                let anchor = rect.anchor();
                if options.is_wrapped(token) {
                    let lines =
                        wrap_text(value, options.font_size, options.wrap_width, &self.metrics);
                    let mut y = anchor.y;
                    for line in &lines {
                        self.insert_line(surface, page, Point::new(anchor.x, y), line)?;
                        y += options.line_height;
                    }
                } else {
                    self.insert_line(surface, page, anchor, value)?;
                }
            }
        }
        Ok(())
    }

    fn insert_line<S: OverlaySurface + ?Sized>(
        &mut self,
        surface: &mut S,
        page: usize,
        origin: Point,
        text: &str,
    ) -> Result<(), StampError> {
        surface.insert_text(
            page,
            origin,
            text,
            self.options.font_size,
            self.options.text_color,
        )?;
        self.summary.text_insertions += 1;
        Ok(())
    }

    fn place_image<S: OverlaySurface + ?Sized>(
        &mut self,
        surface: &mut S,
        page: usize,
    ) -> Result<(), StampError> {
        let (index, options, replacements) = (self.index, self.options, self.replacements);
        if !options.image_pages.contains(&page) {
            return Ok(());
        }
        let token = options.image_token.as_str();
        let Some(url) = replacements.get(token).filter(|url| !url.is_empty()) else {
            return Ok(());
        };

        let mut seen = BTreeSet::new();
        let mut slots: Vec<Rect> = index
            .rects_on_page(token, page)
            .filter(|rect| seen.insert(rect.key()))
            .copied()
            .collect();
        if options.image_placement == ImagePlacement::First {
            slots.truncate(1);
        }
        if slots.is_empty() {
            return Ok(());
        }

        if matches!(self.photo, Photo::Pending) {
            let (width, height) = options.pixel_size();
            self.photo = match self.images.fetch(url) {
                Some(image) => Photo::Ready(
                    image
                        .resize_exact(width, height, FilterType::CatmullRom)
                        .to_rgba8(),
                ),
                None => Photo::Missing,
            };
        }
        let Photo::Ready(photo) = &self.photo else {
            self.summary.image_missing = true;
            return Ok(());
        };

        let size = options.image_size;
        for slot in slots {
            let target = Rect::new(slot.x0, slot.y0, slot.x0 + size.width, slot.y0 + size.height);
            surface.insert_image(page, target, photo)?;
            self.summary.image_insertions += 1;
        }
        Ok(())
    }
}

/// Applies one record to an already opened surface.
pub fn compose_into<S: OverlaySurface + ?Sized>(
    surface: &mut S,
    replacements: &ReplacementMap,
    index: &PositionIndex,
    options: &ComposeOptions,
    images: &dyn ImageSource,
) -> Result<ComposeSummary, StampError> {
    let mut composer = Composer {
        replacements,
        index,
        options,
        images,
        metrics: Base14Metrics::helvetica(),
        photo: Photo::Pending,
        summary: ComposeSummary::default(),
    };
    for page in 0..surface.page_count() {
        composer.place_text(surface, page)?;
        composer.place_image(surface, page)?;
    }
    Ok(composer.summary)
}

/// Opens a fresh copy of `template_path`, stamps one record onto it and saves
/// the result to `output_path`.
pub fn compose(
    template_path: &Path,
    output_path: &Path,
    replacements: &ReplacementMap,
    index: &PositionIndex,
    options: &ComposeOptions,
    images: &dyn ImageSource,
) -> Result<ComposeSummary, StampError> {
    let mut document = TemplatePdf::open(template_path)?;
    let summary = compose_into(&mut document, replacements, index, options, images)?;
    document.save(output_path)?;
    Ok(summary)
}
