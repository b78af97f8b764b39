//! The OCR command: check, authenticate, resolve, process, report.

use std::time::Duration;

use clap::Args;

use crate::{
    batch::run_batch,
    cmd::{RunPlan, effective_formats, interactive},
    credentials::{API_KEY_VAR, CredentialStore, resolve_api_key},
    fonts::FontLocator,
    inputs::resolve_documents,
    ocr::mistral::{DEFAULT_API_BASE, DEFAULT_MODEL, MistralOcrClient},
    output::{OutputFormat, OutputWriter},
    preflight::{check_requirements, default_requirements},
    prelude::*,
    prompting::InputProvider,
    ui::Ui,
};

/// Options for an OCR run.
#[derive(Debug, Clone, Args)]
pub struct OcrOpts {
    /// A single PDF, PNG or JPEG document.
    #[clap(long, value_name = "PATH", conflicts_with = "directory")]
    pub file: Option<PathBuf>,

    /// A directory of documents. Subdirectories are not searched.
    #[clap(long, value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// Output formats, comma-separated. Defaults to markdown.
    #[clap(long, value_enum, value_delimiter = ',')]
    pub format: Vec<OutputFormat>,

    /// Also write a text PDF.
    #[clap(long)]
    pub pdf: bool,

    /// Where to write outputs. Defaults to each document's directory.
    #[clap(long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Mistral API key. Overrides the credential file.
    #[clap(long, env = API_KEY_VAR, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the Mistral API.
    #[clap(long, env = "MISTRAL_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// OCR model to use.
    #[clap(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Give up on a request after this many seconds.
    #[clap(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// File the API key is loaded from and saved to.
    #[clap(long, value_name = "PATH", default_value = ".env")]
    pub env_file: PathBuf,

    /// A font for PDF output. May be repeated; tried before platform fonts.
    #[clap(long = "font", value_name = "PATH")]
    pub fonts: Vec<PathBuf>,

    /// What portion of documents may fail before we exit with an error?
    /// Specified as a number between 0.0 and 1.0.
    #[clap(long, default_value = "0.0")]
    pub allowed_failure_rate: f32,
}

impl OcrOpts {
    /// The plan given on the command line, if an input was given there.
    fn plan_from_flags(&self) -> Result<Option<RunPlan>> {
        let input = match (&self.file, &self.directory) {
            (Some(file), _) => {
                if file.is_dir() {
                    return Err(anyhow!("--file {:?} is a directory", file));
                }
                file.clone()
            }
            (None, Some(dir)) => {
                if dir.is_file() {
                    return Err(anyhow!("--directory {:?} is a file", dir));
                }
                dir.clone()
            }
            (None, None) => return Ok(None),
        };
        Ok(Some(RunPlan {
            input,
            output_dir: self.output_dir.clone(),
            formats: effective_formats(&self.format, self.pdf),
        }))
    }
}

/// Run OCR on everything the operator asked for.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_ocr(
    ui: &Ui,
    opts: &OcrOpts,
    input: &mut dyn InputProvider,
) -> Result<()> {
    check_requirements(&default_requirements())?;

    let store = CredentialStore::new(&opts.env_file);
    let api_key = resolve_api_key(opts.api_key.as_deref(), &store, input)?;

    let plan = match opts.plan_from_flags()? {
        Some(plan) => plan,
        None => interactive::ask_plan(input, opts.output_dir.clone())?,
    };
    debug!(?plan, "Run plan");
    let docs = resolve_documents(&plan.input)?;
    ui.display_message(
        "🔎",
        &format!("Found {} document(s) in {}", docs.len(), plan.input.display()),
    );

    let client = MistralOcrClient::new(
        &opts.api_base,
        api_key,
        opts.model.clone(),
        opts.timeout.map(Duration::from_secs),
    )?;
    let fonts = FontLocator::with_platform_defaults(&opts.fonts);
    let writer = OutputWriter::new(plan.output_dir, plan.formats, &fonts);

    let report = run_batch(ui, &docs, &client, &writer).await;
    report.display(ui);
    report.check_failure_rate(opts.allowed_failure_rate)
}
