use crate::compose::{ComposeOptions, ComposeSummary, compose};
use crate::error::StampError;
use crate::fetch::ImageSource;
use crate::locate::PositionIndex;
use crate::records::{Record, RecordRules};
use crate::report::RunReport;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Written,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    /// Zero-based data row.
    pub row: usize,
    pub output: PathBuf,
    pub status: RecordStatus,
    pub error: Option<String>,
    pub compose: Option<ComposeSummary>,
    pub ms: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub records: usize,
    pub written: usize,
    pub failed: usize,
    pub images_missing: usize,
    /// One entry per record, in row order.
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchSummary {
    fn from_outcomes(mut outcomes: Vec<RecordOutcome>) -> Self {
        outcomes.sort_by_key(|outcome| outcome.row);
        let written = outcomes
            .iter()
            .filter(|o| o.status == RecordStatus::Written)
            .count();
        let images_missing = outcomes
            .iter()
            .filter(|o| o.compose.as_ref().is_some_and(|c| c.image_missing))
            .count();
        Self {
            records: outcomes.len(),
            written,
            failed: outcomes.len() - written,
            images_missing,
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == RecordStatus::Failed)
    }
}

/// Everything one record needs besides its own data. Shared read-only by
/// every worker.
pub struct Batch<'a> {
    pub template: &'a Path,
    pub output_dir: &'a Path,
    pub index: &'a PositionIndex,
    pub options: &'a ComposeOptions,
    pub rules: &'a RecordRules,
    pub images: &'a dyn ImageSource,
    pub report: Option<&'a RunReport>,
}

impl Batch<'_> {
    /// Composes every record. A failing record is recorded and the rest carry
    /// on; only setup problems (output directory, thread pool) are returned as
    /// errors. `workers == 0` lets rayon pick.
    pub fn run(&self, records: &[Record], workers: usize) -> Result<BatchSummary, StampError> {
        std::fs::create_dir_all(self.output_dir)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|err| StampError::InvalidConfiguration(format!("thread pool: {}", err)))?;

        let groups = self.group_by_output(records);
        let outcomes: Vec<RecordOutcome> = pool.install(|| {
            groups
                .par_iter()
                .flat_map_iter(|(output, rows)| {
                    rows.iter()
                        .map(|row| self.run_one(*row, &records[*row], output))
                        .collect::<Vec<_>>()
                })
                .collect()
        });
        Ok(BatchSummary::from_outcomes(outcomes))
    }

    /// Rows sharing an output file stay together, in row order, so the last
    /// one wins deterministically.
    fn group_by_output(&self, records: &[Record]) -> Vec<(PathBuf, Vec<usize>)> {
        let mut groups: Vec<(PathBuf, Vec<usize>)> = Vec::new();
        let mut slot_of: HashMap<PathBuf, usize> = HashMap::new();
        for (row, record) in records.iter().enumerate() {
            let output = self
                .output_dir
                .join(self.rules.output_file_name(record, row));
            match slot_of.get(&output) {
                Some(slot) => {
                    log::warn!(
                        "row {} overwrites {} from an earlier row",
                        row + 1,
                        output.display()
                    );
                    groups[*slot].1.push(row);
                }
                None => {
                    slot_of.insert(output.clone(), groups.len());
                    groups.push((output, vec![row]));
                }
            }
        }
        groups
    }

    fn run_one(&self, row: usize, record: &Record, output: &Path) -> RecordOutcome {
        let started = Instant::now();
        let replacements = self.rules.replacement_map(record, self.index, self.options);
        let result = compose(
            self.template,
            output,
            &replacements,
            self.index,
            self.options,
            self.images,
        );
        let ms = started.elapsed().as_secs_f64() * 1000.0;

        let outcome = match result {
            Ok(summary) => {
                log::info!("wrote {} in {:.1} ms", output.display(), ms);
                RecordOutcome {
                    row,
                    output: output.to_path_buf(),
                    status: RecordStatus::Written,
                    error: None,
                    compose: Some(summary),
                    ms,
                }
            }
            Err(err) => {
                log::warn!("row {} ({}) failed: {}", row + 1, output.display(), err);
                RecordOutcome {
                    row,
                    output: output.to_path_buf(),
                    status: RecordStatus::Failed,
                    error: Some(err.to_string()),
                    compose: None,
                    ms,
                }
            }
        };
        if let Some(report) = self.report {
            report.log_record(&outcome);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::{DEFAULT_TOKEN_PATTERN, TokenPattern, locate};
    use crate::testutil::{PageSpec, unique_temp_dir, write_pdf};
    use image::DynamicImage;

    struct NoImages;

    impl ImageSource for NoImages {
        fn fetch(&self, _url: &str) -> Option<DynamicImage> {
            None
        }
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    struct Fixture {
        dir: PathBuf,
        template: PathBuf,
        index: PositionIndex,
    }

    fn fixture(label: &str) -> Fixture {
        let dir = unique_temp_dir(label);
        let annotated = dir.join("annotated.pdf");
        let template = dir.join("template.pdf");
        write_pdf(&annotated, &[PageSpec::raw("BT /F2 10 Tf 100 684 Td (#Name) Tj ET")]);
        write_pdf(&template, &[PageSpec::text("CERTIFICATE")]);
        let pattern = TokenPattern::new(DEFAULT_TOKEN_PATTERN).expect("pattern");
        let index = locate(&annotated, &pattern).expect("locate");
        Fixture {
            dir,
            template,
            index,
        }
    }

    #[test]
    fn writes_one_file_per_record_and_creates_output_dir() {
        let fx = fixture("batch_ok");
        let out_dir = fx.dir.join("nested").join("StudentPdfs");
        let options = ComposeOptions::default();
        let rules = RecordRules::default();
        let batch = Batch {
            template: &fx.template,
            output_dir: &out_dir,
            index: &fx.index,
            options: &options,
            rules: &rules,
            images: &NoImages,
            report: None,
        };
        let records = vec![
            record(&[("#Name", "Asha")]),
            record(&[("#Name", "Ravi")]),
            record(&[("#Name", "Meera")]),
        ];

        let summary = batch.run(&records, 2).expect("batch");

        assert_eq!((summary.records, summary.written, summary.failed), (3, 3, 0));
        for name in ["Asha", "Ravi", "Meera"] {
            assert!(out_dir.join(format!("{name}_certificate.pdf")).is_file());
        }
        let rows: Vec<usize> = summary.outcomes.iter().map(|o| o.row).collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn failing_record_does_not_stop_the_rest() {
        let fx = fixture("batch_fail");
        let out_dir = fx.dir.join("out");
        std::fs::create_dir_all(&out_dir).expect("mkdir");
        // A directory where the output file should go makes that save fail.
        std::fs::create_dir_all(out_dir.join("Blocked_certificate.pdf")).expect("mkdir");
        let options = ComposeOptions::default();
        let rules = RecordRules::default();
        let batch = Batch {
            template: &fx.template,
            output_dir: &out_dir,
            index: &fx.index,
            options: &options,
            rules: &rules,
            images: &NoImages,
            report: None,
        };
        let records = vec![record(&[("#Name", "Blocked")]), record(&[("#Name", "Asha")])];

        let summary = batch.run(&records, 1).expect("batch");

        assert_eq!((summary.written, summary.failed), (1, 1));
        let failure = summary.failures().next().expect("failure");
        assert_eq!(failure.row, 0);
        assert!(failure.error.as_deref().unwrap_or("").contains("io error"));
        assert!(out_dir.join("Asha_certificate.pdf").is_file());
    }

    #[test]
    fn duplicate_names_keep_the_last_row() {
        let fx = fixture("batch_dupe");
        let out_dir = fx.dir.join("out");
        let options = ComposeOptions::default();
        let rules = RecordRules::default();
        let batch = Batch {
            template: &fx.template,
            output_dir: &out_dir,
            index: &fx.index,
            options: &options,
            rules: &rules,
            images: &NoImages,
            report: None,
        };
        let groups = batch.group_by_output(&[
            record(&[("#Name", "Asha")]),
            record(&[("#Name", "Ravi")]),
            record(&[("#Name", "Asha")]),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1, vec![0, 2]);
        assert_eq!(groups[1].1, vec![1]);
    }

    #[test]
    fn missing_template_fails_each_record() {
        let fx = fixture("batch_missing_template");
        let missing = fx.dir.join("gone.pdf");
        let out_dir = fx.dir.join("out");
        let options = ComposeOptions::default();
        let rules = RecordRules::default();
        let batch = Batch {
            template: &missing,
            output_dir: &out_dir,
            index: &fx.index,
            options: &options,
            rules: &rules,
            images: &NoImages,
            report: None,
        };
        let summary = batch
            .run(&[record(&[("#Name", "Asha")]), record(&[])], 0)
            .expect("batch");
        assert_eq!(summary.failed, 2);
        assert!(
            summary
                .failures()
                .all(|o| o.error.as_deref().unwrap_or("").contains("TEMPLATE_IO_ERROR"))
        );
    }
}
