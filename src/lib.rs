mod batch;
mod cmap;
mod compose;
mod config;
mod error;
mod fetch;
mod inspect;
mod locate;
mod metrics;
mod pdf;
mod pdf_text;
mod records;
mod report;
#[cfg(test)]
mod testutil;
mod types;
mod wrap;

pub use batch::{Batch, BatchSummary, RecordOutcome, RecordStatus};
pub use compose::{
    ComposeOptions, ComposeSummary, ImagePlacement, OverlaySurface, ReplacementMap, compose,
    compose_into,
};
pub use config::StampConfig;
pub use error::StampError;
pub use fetch::{DEFAULT_FETCH_TIMEOUT, HttpImageSource, ImageSource};
pub use inspect::{
    TemplateInspectError, TemplateInspectErrorCode, TemplateReport, inspect_template_bytes,
    inspect_template_path, require_stamp_compatibility, stamp_compatibility_issues,
};
pub use locate::{
    DEFAULT_TOKEN_PATTERN, PageHits, PositionIndex, TextSearch, TokenPattern, locate,
    locate_tokens,
};
pub use metrics::{Base14Family, Base14Metrics, TextMeasure};
pub use pdf::TemplatePdf;
pub use records::{Record, RecordRules, read_records, read_records_from};
pub use report::RunReport;
pub use types::{Color, Point, Rect, Size};
pub use wrap::wrap_text;

use std::collections::BTreeSet;
use std::time::Instant;

/// Locates tokens once, then stamps every record of `config.records` with
/// photos from `images`. Setup failures are returned; per-record failures are
/// collected in the summary.
pub fn generate(
    config: &StampConfig,
    images: &dyn ImageSource,
) -> Result<BatchSummary, StampError> {
    config.validate()?;
    let pattern = TokenPattern::new(&config.token_pattern)?;
    let report = match &config.report {
        Some(path) => Some(RunReport::new(path)?),
        None => None,
    };
    let t_total = Instant::now();

    let t_locate = Instant::now();
    let index = locate(&config.annotated_template, &pattern)?;
    let locate_ms = t_locate.elapsed().as_secs_f64() * 1000.0;
    if let Some(report) = &report {
        let pages: BTreeSet<usize> = index
            .iter()
            .flat_map(|(_, hits)| hits.iter().map(|h| h.page))
            .collect();
        report.log_locate(index.len(), &pages.into_iter().collect::<Vec<_>>());
        report.log_span_ms("locate", locate_ms);
    }
    if index.is_empty() {
        log::warn!(
            "no tokens matching {} in {}",
            config.token_pattern,
            config.annotated_template.display()
        );
    }

    let records = read_records(&config.records)?;
    log::info!("{} records from {}", records.len(), config.records.display());

    let batch = Batch {
        template: &config.template,
        output_dir: &config.output_dir,
        index: &index,
        options: &config.compose,
        rules: &config.rules,
        images,
        report: report.as_ref(),
    };
    let t_batch = Instant::now();
    let summary = batch.run(&records, config.workers)?;
    let batch_ms = t_batch.elapsed().as_secs_f64() * 1000.0;

    if let Some(report) = &report {
        report.log_span_ms("batch", batch_ms);
        report.log_summary(&summary);
        report.flush();
    }
    log::info!(
        "stamped {}/{} records in {:.1} ms ({} failed, {} without image)",
        summary.written,
        summary.records,
        t_total.elapsed().as_secs_f64() * 1000.0,
        summary.failed,
        summary.images_missing
    );
    Ok(summary)
}

/// [`generate`] with photos fetched over HTTP.
pub fn run(config: &StampConfig) -> Result<BatchSummary, StampError> {
    let images = HttpImageSource::new(config.fetch_timeout())?;
    generate(config, &images)
}
