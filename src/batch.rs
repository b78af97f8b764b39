//! Processing documents one after another and keeping score.
//!
//! A failure on one document is recorded and the batch moves on. Nothing
//! here returns early with `?`; every document ends up as a
//! [`DocumentOutcome`], and the summary is computed from those.

use crate::{
    inputs::DocumentRef,
    ocr::OcrService,
    output::OutputWriter,
    prelude::*,
    ui::{ProgressConfig, Ui},
};

/// How did a document do?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// OCR and every output format succeeded.
    Ok,

    /// OCR succeeded, but some output formats could not be written.
    Incomplete,

    /// Nothing was written.
    Failed,
}

/// The result of processing one document.
#[derive(Clone, Debug, Serialize)]
pub struct DocumentOutcome {
    /// The source document.
    pub document: PathBuf,

    pub status: DocumentStatus,

    /// Files we wrote.
    pub outputs: Vec<PathBuf>,

    /// Everything that went wrong.
    pub errors: Vec<String>,
}

impl DocumentOutcome {
    fn failed(doc: &DocumentRef, error: String) -> Self {
        Self {
            document: doc.path.clone(),
            status: DocumentStatus::Failed,
            outputs: vec![],
            errors: vec![error],
        }
    }
}

/// OCR one document and write its outputs.
#[instrument(level = "debug", skip_all, fields(doc = %doc))]
pub async fn process_document(
    doc: &DocumentRef,
    service: &dyn OcrService,
    writer: &OutputWriter<'_>,
) -> DocumentOutcome {
    let data = match tokio::fs::read(&doc.path).await {
        Ok(data) => data,
        Err(err) => {
            error!(doc = %doc, "Cannot read document: {err}");
            return DocumentOutcome::failed(doc, format!("cannot read document: {err}"));
        }
    };

    info!(doc = %doc, bytes = data.len(), "Running OCR");
    let result = match service.submit(&data, doc.kind.mime_type()).await {
        Ok(result) => result,
        Err(err) => {
            error!(doc = %doc, "OCR failed: {err}");
            return DocumentOutcome::failed(doc, err.to_string());
        }
    };
    drop(data);

    let mut outcome = DocumentOutcome {
        document: doc.path.clone(),
        status: DocumentStatus::Ok,
        outputs: vec![],
        errors: vec![],
    };
    for (format, written) in writer.write_all(doc, &result) {
        match written {
            Ok(path) => outcome.outputs.push(path),
            Err(err) => outcome.errors.push(format!("{format}: {err:#}")),
        }
    }
    if !outcome.errors.is_empty() {
        outcome.status = if outcome.outputs.is_empty() {
            DocumentStatus::Failed
        } else {
            DocumentStatus::Incomplete
        };
    }
    outcome
}

/// Process `docs` in order, one at a time.
pub async fn run_batch(
    ui: &Ui,
    docs: &[DocumentRef],
    service: &dyn OcrService,
    writer: &OutputWriter<'_>,
) -> BatchReport {
    let pb = ui.new_progress_bar(
        &ProgressConfig {
            emoji: "📄",
            msg: "OCRing documents",
            done_msg: "OCRed documents",
        },
        u64::try_from(docs.len()).unwrap_or(u64::MAX),
    );
    for doc in writer.colliding_documents(docs) {
        warn!(
            doc = %doc,
            "Outputs share a name with an earlier document and will overwrite its outputs"
        );
    }
    let mut outcomes = Vec::with_capacity(docs.len());
    for doc in docs {
        outcomes.push(process_document(doc, service, writer).await);
        pb.inc(1);
    }
    pb.finish_using_style();
    BatchReport { outcomes }
}

/// Outcomes for a whole batch.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DocumentStatus::Ok)
            .count()
    }

    /// Documents that were not fully processed, including incomplete ones.
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failure_rate(&self) -> f32 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.failed() as f32 / self.total() as f32
        }
    }

    /// Show the summary to the user.
    pub fn display(&self, ui: &Ui) {
        for outcome in &self.outcomes {
            if outcome.status == DocumentStatus::Ok {
                continue;
            }
            let emoji = match outcome.status {
                DocumentStatus::Incomplete => "⚠️",
                _ => "❌",
            };
            ui.display_message(
                emoji,
                &format!(
                    "{}: {}",
                    outcome.document.display(),
                    outcome.errors.join("; ")
                ),
            );
        }
        let written = self.outcomes.iter().map(|o| o.outputs.len()).sum::<usize>();
        ui.display_message(
            "📊",
            &format!(
                "{} of {} documents succeeded, {} failed; {} files written",
                self.succeeded(),
                self.total(),
                self.failed(),
                written,
            ),
        );
    }

    /// Fail if more documents failed than we were allowed.
    pub fn check_failure_rate(&self, allowed_failure_rate: f32) -> Result<()> {
        let failure_rate = self.failure_rate();
        if failure_rate > allowed_failure_rate {
            Err(anyhow!(
                "{}/{} ({:.2}%) of documents failed, but only {:.2}% were allowed",
                self.failed(),
                self.total(),
                failure_rate * 100.0,
                allowed_failure_rate * 100.0
            ))
        } else {
            Ok(())
        }
    }
}
