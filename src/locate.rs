use crate::error::StampError;
use crate::pdf::TemplatePdf;
use crate::types::Rect;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const DEFAULT_TOKEN_PATTERN: &str = r"#\w+";

/// Text lookup over a paged document.
pub trait TextSearch {
    fn page_count(&self) -> usize;
    fn page_text(&self, page: usize) -> Result<String, StampError>;
    /// Every box where `needle` occurs literally on `page`, in scan order.
    fn search_for(&self, page: usize, needle: &str) -> Result<Vec<Rect>, StampError>;
}

/// Rectangles of one token on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageHits {
    pub page: usize,
    pub rects: Vec<Rect>,
}

/// Token → hits, page-ordered. Built once and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionIndex {
    entries: BTreeMap<String, Vec<PageHits>>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, token: &str, page: usize, rects: Vec<Rect>) {
        self.entries
            .entry(token.to_string())
            .or_default()
            .push(PageHits { page, rects });
    }

    pub fn get(&self, token: &str) -> Option<&[PageHits]> {
        self.entries.get(token).map(Vec::as_slice)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PageHits])> {
        self.entries
            .iter()
            .map(|(token, hits)| (token.as_str(), hits.as_slice()))
    }

    /// Rectangles of `token` on `page`, across every group for that page.
    pub fn rects_on_page<'a>(&'a self, token: &str, page: usize) -> impl Iterator<Item = &'a Rect> {
        self.entries
            .get(token)
            .into_iter()
            .flatten()
            .filter(move |hits| hits.page == page)
            .flat_map(|hits| hits.rects.iter())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lexical rule that picks placeholder tokens out of page text.
#[derive(Debug, Clone)]
pub struct TokenPattern {
    regex: Regex,
}

impl TokenPattern {
    pub fn new(pattern: &str) -> Result<Self, StampError> {
        let regex = Regex::new(pattern).map_err(|err| {
            StampError::InvalidConfiguration(format!("token pattern {pattern:?}: {err}"))
        })?;
        Ok(Self { regex })
    }

    /// Distinct matches in first-seen order.
    pub fn distinct_matches<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut seen = BTreeSet::new();
        self.regex
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|token| seen.insert(*token))
            .collect()
    }
}

pub fn locate_tokens<S: TextSearch + ?Sized>(
    source: &S,
    pattern: &TokenPattern,
) -> Result<PositionIndex, StampError> {
    let mut index = PositionIndex::new();
    for page in 0..source.page_count() {
        let text = source.page_text(page)?;
        for token in pattern.distinct_matches(&text) {
            let rects = source.search_for(page, token)?;
            log::debug!("page {} token {} hits={}", page, token, rects.len());
            index.push(token, page, rects);
        }
    }
    Ok(index)
}

/// Scans the annotated template at `path` once and drops it.
pub fn locate(path: &Path, pattern: &TokenPattern) -> Result<PositionIndex, StampError> {
    let template = TemplatePdf::open(path)?;
    let index = locate_tokens(&template, pattern)?;
    log::info!(
        "located {} tokens across {} pages in {}",
        index.len(),
        template.page_count(),
        path.display()
    );
    Ok(index)
}
