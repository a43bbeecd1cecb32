use lopdf::Document as LoDocument;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateInspectErrorCode {
    TemplateParseFailed,
    TemplateEncryptedUnsupported,
    TemplateEmptyOrNoPages,
    TemplateIoError,
}

impl TemplateInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateInspectErrorCode::TemplateParseFailed => "TEMPLATE_PARSE_FAILED",
            TemplateInspectErrorCode::TemplateEncryptedUnsupported => {
                "TEMPLATE_ENCRYPTED_UNSUPPORTED"
            }
            TemplateInspectErrorCode::TemplateEmptyOrNoPages => "TEMPLATE_EMPTY_OR_NO_PAGES",
            TemplateInspectErrorCode::TemplateIoError => "TEMPLATE_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInspectError {
    pub code: TemplateInspectErrorCode,
    pub message: String,
}

impl std::fmt::Display for TemplateInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for TemplateInspectError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
}

/// Parses template bytes and checks that they can be stamped. The parsed
/// document is handed back so callers never load the same bytes twice.
pub(crate) fn load_template_bytes(bytes: &[u8]) -> Result<LoDocument, TemplateInspectError> {
    let (pdf, report) = parse_template(bytes)?;
    require_stamp_compatibility(&report)?;
    Ok(pdf)
}

fn parse_template(bytes: &[u8]) -> Result<(LoDocument, TemplateReport), TemplateInspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| TemplateInspectError {
        code: TemplateInspectErrorCode::TemplateParseFailed,
        message: err.to_string(),
    })?;
    let report = TemplateReport {
        pdf_version: pdf.version.clone(),
        page_count: pdf.get_pages().len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
    };
    Ok((pdf, report))
}

pub fn inspect_template_bytes(bytes: &[u8]) -> Result<TemplateReport, TemplateInspectError> {
    parse_template(bytes).map(|(_, report)| report)
}

pub fn inspect_template_path(path: &Path) -> Result<TemplateReport, TemplateInspectError> {
    let data = read_template(path)?;
    inspect_template_bytes(&data)
}

pub(crate) fn read_template(path: &Path) -> Result<Vec<u8>, TemplateInspectError> {
    std::fs::read(path).map_err(|err| TemplateInspectError {
        code: TemplateInspectErrorCode::TemplateIoError,
        message: format!("{}: {}", path.display(), err),
    })
}

pub fn stamp_compatibility_issues(report: &TemplateReport) -> Vec<TemplateInspectErrorCode> {
    let mut issues = Vec::new();
    if report.encrypted {
        issues.push(TemplateInspectErrorCode::TemplateEncryptedUnsupported);
    }
    if report.page_count == 0 {
        issues.push(TemplateInspectErrorCode::TemplateEmptyOrNoPages);
    }
    issues
}

pub fn require_stamp_compatibility(report: &TemplateReport) -> Result<(), TemplateInspectError> {
    match stamp_compatibility_issues(report).into_iter().next() {
        Some(TemplateInspectErrorCode::TemplateEncryptedUnsupported) => Err(TemplateInspectError {
            code: TemplateInspectErrorCode::TemplateEncryptedUnsupported,
            message: "encrypted templates are not supported".to_string(),
        }),
        Some(TemplateInspectErrorCode::TemplateEmptyOrNoPages) => Err(TemplateInspectError {
            code: TemplateInspectErrorCode::TemplateEmptyOrNoPages,
            message: "template has no pages".to_string(),
        }),
        _ => Ok(()),
    }
}
