use std::str::FromStr;

use clap::Parser;
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{prelude::*, prompting::TerminalInput, ui::Ui};

mod batch;
mod cmd;
mod credentials;
mod data_url;
mod fonts;
mod inputs;
mod ocr;
mod output;
mod preflight;
mod prelude;
mod prompting;
mod ui;

/// OCR PDFs and images with Mistral, writing Markdown, text, JSON or PDF.
///
/// Run without `--file` or `--directory` to be asked what to process.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - MISTRAL_API_KEY: The Mistral API key to use. If it is not set and not
    found in the credential file, you will be asked for it once, and it will
    be saved to the credential file.
  - MISTRAL_API_BASE (optional): Override the server URL.
  - RUST_LOG (optional): Logging filter, for example `debug`.
"#
)]
struct Opts {
    #[clap(flatten)]
    ocr: cmd::ocr::OcrOpts,
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);

    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Parse command-line arguments.
    let opts = Opts::parse();
    debug!(
        file = ?opts.ocr.file,
        directory = ?opts.ocr.directory,
        formats = ?opts.ocr.format,
        "Parsed options"
    );

    let mut input = TerminalInput::new(ui.clone());
    cmd::ocr::cmd_ocr(&ui, &opts.ocr, &mut input).await
}
