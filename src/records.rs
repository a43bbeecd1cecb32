use crate::compose::{ComposeOptions, ReplacementMap};
use crate::error::StampError;
use crate::locate::PositionIndex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// One input row: column header → cell. Empty cells are left out.
pub type Record = BTreeMap<String, String>;

/// How records are turned into image URLs and output file names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecordRules {
    pub id_column: String,
    /// `{id}` is replaced with the tail of the identifier.
    pub image_url_template: String,
    pub id_tail_len: usize,
    pub name_column: String,
    pub file_suffix: String,
}

impl Default for RecordRules {
    fn default() -> Self {
        Self {
            id_column: "#UidNumber".to_string(),
            image_url_template: "https://sbpsranchi.in/Stn/stnImg1920/S-{id}.jpg".to_string(),
            id_tail_len: 4,
            name_column: "#Name".to_string(),
            file_suffix: "_certificate.pdf".to_string(),
        }
    }
}

impl RecordRules {
    pub fn validate(&self) -> Result<(), StampError> {
        if !self.image_url_template.contains("{id}") {
            return Err(StampError::InvalidConfiguration(format!(
                "image_url_template must contain {{id}}: {}",
                self.image_url_template
            )));
        }
        if self.file_suffix.contains(['/', '\\']) {
            return Err(StampError::InvalidConfiguration(format!(
                "file_suffix must not contain path separators: {}",
                self.file_suffix
            )));
        }
        Ok(())
    }

    /// URL for a record, or an empty string when it has no identifier.
    pub fn image_url(&self, record: &Record) -> String {
        let Some(id) = record.get(&self.id_column) else {
            return String::new();
        };
        let chars: Vec<char> = id.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(self.id_tail_len)..]
            .iter()
            .collect();
        self.image_url_template.replace("{id}", &tail)
    }

    /// `<name><suffix>`, with separators neutralised. Rows without a usable
    /// name fall back to their 1-based position.
    pub fn output_file_name(&self, record: &Record, row: usize) -> String {
        let name: String = record
            .get(&self.name_column)
            .map(|name| {
                name.chars()
                    .map(|ch| match ch {
                        '/' | '\\' => '_',
                        ch if ch.is_control() => '_',
                        ch => ch,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let stem = match name.as_str() {
            "" | "." | ".." => format!("record-{}", row + 1),
            _ => name,
        };
        format!("{}{}", stem, self.file_suffix)
    }

    /// Values for every located token the record can fill. The image token
    /// always maps to the derived URL.
    pub fn replacement_map(
        &self,
        record: &Record,
        index: &PositionIndex,
        options: &ComposeOptions,
    ) -> ReplacementMap {
        let mut map = ReplacementMap::new();
        for token in index.tokens() {
            if token == options.image_token {
                map.insert(token.to_string(), self.image_url(record));
            } else if let Some(value) = record.get(token) {
                map.insert(token.to_string(), value.clone());
            }
        }
        map
    }
}

pub fn read_records_from<R: Read>(reader: R) -> Result<Vec<Record>, StampError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv.headers()?.clone();
    let mut records = Vec::new();
    for row in csv.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        records.push(record);
    }
    Ok(records)
}

pub fn read_records(path: &Path) -> Result<Vec<Record>, StampError> {
    let file = std::fs::File::open(path).map_err(|err| {
        StampError::Records(format!("cannot open {}: {}", path.display(), err))
    })?;
    read_records_from(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::{TextSearch, TokenPattern, locate_tokens};
    use crate::types::Rect;

    struct TokensOnOnePage(&'static str);

    impl TextSearch for TokensOnOnePage {
        fn page_count(&self) -> usize {
            1
        }

        fn page_text(&self, _page: usize) -> Result<String, StampError> {
            Ok(self.0.to_string())
        }

        fn search_for(&self, _page: usize, _needle: &str) -> Result<Vec<Rect>, StampError> {
            Ok(vec![Rect::new(0.0, 0.0, 1.0, 1.0)])
        }
    }

    fn index_with(text: &'static str) -> PositionIndex {
        let pattern = TokenPattern::new(crate::locate::DEFAULT_TOKEN_PATTERN).expect("pattern");
        locate_tokens(&TokensOnOnePage(text), &pattern).expect("locate")
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reads_rows_and_drops_empty_cells() {
        let csv = "#Name,#UidNumber,#Opinion\nAsha,10001234,Good work\n Ravi ,,\n";
        let records = read_records_from(csv.as_bytes()).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["#Opinion"], "Good work");
        assert_eq!(records[1], record(&[("#Name", "Ravi")]));
    }

    #[test]
    fn quoted_cells_keep_commas() {
        let csv = "#Name,#Opinion\n\"Asha\",\"Kind, diligent\"\n";
        let records = read_records_from(csv.as_bytes()).expect("records");
        assert_eq!(records[0]["#Opinion"], "Kind, diligent");
    }

    #[test]
    fn ragged_rows_are_a_records_error() {
        let csv = "#Name,#UidNumber\nAsha,1,extra\n";
        let err = read_records_from(csv.as_bytes()).expect_err("ragged");
        assert!(matches!(err, StampError::Records(_)));
    }

    #[test]
    fn image_url_uses_last_four_characters() {
        let rules = RecordRules::default();
        assert_eq!(
            rules.image_url(&record(&[("#UidNumber", "10001234")])),
            "https://sbpsranchi.in/Stn/stnImg1920/S-1234.jpg"
        );
        assert_eq!(
            rules.image_url(&record(&[("#UidNumber", "77")])),
            "https://sbpsranchi.in/Stn/stnImg1920/S-77.jpg"
        );
        assert_eq!(rules.image_url(&record(&[])), "");
    }

    #[test]
    fn replacement_map_keeps_only_located_tokens() {
        let index = index_with("#Name #Class #Image");
        let rules = RecordRules::default();
        let map = rules.replacement_map(
            &record(&[("#Name", "Asha"), ("#UidNumber", "10001234"), ("#Extra", "x")]),
            &index,
            &ComposeOptions::default(),
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map["#Name"], "Asha");
        assert_eq!(map["#Image"], "https://sbpsranchi.in/Stn/stnImg1920/S-1234.jpg");
        assert!(!map.contains_key("#Class"));
    }

    #[test]
    fn output_names_are_confined_to_one_path_component() {
        let rules = RecordRules::default();
        assert_eq!(
            rules.output_file_name(&record(&[("#Name", "Asha")]), 0),
            "Asha_certificate.pdf"
        );
        assert_eq!(
            rules.output_file_name(&record(&[("#Name", "../etc/x")]), 0),
            ".._etc_x_certificate.pdf"
        );
        assert_eq!(rules.output_file_name(&record(&[]), 4), "record-5_certificate.pdf");
        assert_eq!(
            rules.output_file_name(&record(&[("#Name", "..")]), 1),
            "record-2_certificate.pdf"
        );
    }

    #[test]
    fn validate_requires_id_placeholder() {
        assert!(RecordRules::default().validate().is_ok());
        let rules = RecordRules {
            image_url_template: "https://example.invalid/photo.jpg".to_string(),
            ..RecordRules::default()
        };
        assert!(rules.validate().is_err());
    }
}
