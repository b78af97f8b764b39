//! Asking what to do when no input was given on the command line.

use crate::{
    cmd::{RunPlan, effective_formats},
    inputs::strip_quotes,
    output::OutputFormat,
    prelude::*,
    prompting::{InputProvider, anything},
};

/// Answers that mean "yes".
const YES: &[&str] = &["y", "yes", "是", "1", "true"];

fn existing_path(value: &str) -> Result<(), String> {
    let path = Path::new(strip_quotes(value));
    if value.is_empty() {
        Err("A path is required.".to_owned())
    } else if path.exists() {
        Ok(())
    } else {
        Err(format!("{} does not exist.", path.display()))
    }
}

fn format_choice(value: &str) -> Result<(), String> {
    match value {
        "" | "1" | "2" | "3" => Ok(()),
        _ => Err("Please enter 1, 2 or 3.".to_owned()),
    }
}

/// Ask for everything a run needs. `output_dir` is used as is if the
/// operator already supplied one.
#[instrument(level = "debug", skip_all)]
pub fn ask_plan(
    input: &mut dyn InputProvider,
    output_dir: Option<PathBuf>,
) -> Result<RunPlan> {
    let answer = input.obtain(
        "Path to a PDF/image file, or a directory of them:",
        &existing_path,
    )?;
    let path = PathBuf::from(strip_quotes(&answer));

    let output_dir = match output_dir {
        Some(dir) => Some(dir),
        None if path.is_dir() => {
            let answer = input.obtain(
                "Output directory (empty to write next to each document):",
                &anything,
            )?;
            let dir = strip_quotes(&answer);
            (!dir.is_empty()).then(|| PathBuf::from(dir))
        }
        None => None,
    };

    let format = match input
        .obtain(
            "Output format: [1] Markdown  [2] Text  [3] JSON (default 1):",
            &format_choice,
        )?
        .as_str()
    {
        "2" => OutputFormat::Text,
        "3" => OutputFormat::Json,
        _ => OutputFormat::Markdown,
    };

    let pdf = input.obtain("Also create a text PDF? [y/N]:", &anything)?;
    let pdf = YES.contains(&pdf.to_lowercase().as_str());

    Ok(RunPlan {
        input: path,
        output_dir,
        formats: effective_formats(&[format], pdf),
    })
}
