//! Pre-flight checks for the components we can't run without.
//!
//! Everything here is compiled in, but the TLS stack and the PDF backend can
//! still fail to initialize on a broken build or platform. We find out before
//! touching any documents.

use std::fmt;

use printpdf::{PdfDocument, PdfSaveOptions, PdfWarnMsg};

use crate::prelude::*;

/// How to get a working build.
pub const INSTALL_COMMAND: &str = "cargo install --locked --force mistral-ocr";

/// A component we depend on, and how to check that it works.
pub struct Requirement {
    /// Human-readable name of the component.
    pub name: &'static str,
    /// Returns an error if the component is unusable.
    pub probe: fn() -> Result<()>,
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("name", &self.name)
            .finish()
    }
}

/// The requirements for a normal run.
pub fn default_requirements() -> Vec<Requirement> {
    vec![
        Requirement {
            name: "reqwest (HTTPS client with rustls)",
            probe: probe_http_client,
        },
        Requirement {
            name: "printpdf (PDF writer)",
            probe: probe_pdf_backend,
        },
    ]
}

fn probe_http_client() -> Result<()> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .build()
        .context("cannot initialize HTTPS client")?;
    Ok(())
}

fn probe_pdf_backend() -> Result<()> {
    let doc = PdfDocument::new("probe");
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(anyhow!("PDF backend produced invalid output"))
    }
}

/// Some requirements were not met.
#[derive(Debug, thiserror::Error)]
#[error(
    "missing required components: {}\n\nReinstall with:\n\n    {}",
    .missing.join(", "),
    INSTALL_COMMAND
)]
pub struct MissingDependencies {
    pub missing: Vec<String>,
}

/// Check every requirement, and fail naming all the ones that are missing.
#[instrument(level = "debug", skip_all)]
pub fn check_requirements(requirements: &[Requirement]) -> Result<(), MissingDependencies> {
    let mut missing = vec![];
    for req in requirements {
        match (req.probe)() {
            Ok(()) => debug!(name = req.name, "Requirement available"),
            Err(err) => {
                error!(name = req.name, "Requirement unavailable: {err:#}");
                missing.push(req.name.to_owned());
            }
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingDependencies { missing })
    }
}
