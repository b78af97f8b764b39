//! Markdown output, with extracted images saved next to it.

use std::{collections::HashMap, fs};

use crate::{
    data_url::decode_payload,
    ocr::{OcrImage, OcrResult},
    prelude::*,
};

/// Written after every page.
pub const PAGE_BREAK_MARKER: &str = "<!-- page-break -->";

/// Write `<base>_OCR.md` plus its images to `dir`.
pub fn write_markdown(path: &Path, base_name: &str, result: &OcrResult) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let image_dir_name = format!("{base_name}_OCR_images");
    let links = result
        .pages
        .iter()
        .map(|page| save_page_images(dir, &image_dir_name, &page.images))
        .collect::<Result<Vec<_>>>()?;
    let markdown = render_markdown(result, &links);
    fs::write(path, markdown).with_context(|| format!("cannot write {:?}", path))
}

/// Join page texts in order, pointing image references at `links`.
///
/// `links[i]` maps image IDs on page `i` to the path to link to. Images
/// without an entry keep their original reference.
pub fn render_markdown(result: &OcrResult, links: &[HashMap<String, String>]) -> String {
    let mut out = String::new();
    for (idx, page) in result.pages.iter().enumerate() {
        let mut text = page.markdown.clone();
        if let Some(links) = links.get(idx) {
            for (id, link) in links {
                text = text.replace(&format!("![{id}]({id})"), &format!("![{id}]({link})"));
            }
        }
        out.push_str(text.trim_end());
        out.push_str("\n\n");
        out.push_str(PAGE_BREAK_MARKER);
        out.push_str("\n\n");
    }
    out
}

/// Decode and save a page's images, returning a map from image ID to
/// relative link.
///
/// Images with bad data are skipped with a warning, since the text is still
/// useful without them.
fn save_page_images(
    dir: &Path,
    image_dir_name: &str,
    images: &[OcrImage],
) -> Result<HashMap<String, String>> {
    let mut links = HashMap::new();
    for image in images {
        let Some(payload) = image.payload() else {
            continue;
        };
        let (mime_type, bytes) = match decode_payload(payload) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(id = %image.id, "Skipping image: {err:#}");
                continue;
            }
        };
        let file_name = image_file_name(&image.id, mime_type.as_deref(), &bytes);
        let image_dir = dir.join(image_dir_name);
        fs::create_dir_all(&image_dir)
            .with_context(|| format!("cannot create {:?}", image_dir))?;
        let image_path = image_dir.join(&file_name);
        fs::write(&image_path, &bytes)
            .with_context(|| format!("cannot write {:?}", image_path))?;
        debug!(path = %image_path.display(), "Saved image");
        links.insert(
            image.id.clone(),
            link_destination(&format!("{image_dir_name}/{file_name}")),
        );
    }
    Ok(links)
}

/// Format a relative path as a Markdown link destination. Paths with
/// spaces or brackets use the `<...>` form.
fn link_destination(path: &str) -> String {
    if !path.contains(|c: char| c.is_whitespace() || "()<>".contains(c)) {
        return path.to_owned();
    }
    let mut out = String::with_capacity(path.len() + 2);
    out.push('<');
    for c in path.chars() {
        if matches!(c, '<' | '>' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('>');
    out
}

/// Pick a safe file name for an extracted image.
fn image_file_name(id: &str, mime_type: Option<&str>, bytes: &[u8]) -> String {
    let name = Path::new(id)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "image".to_owned());
    if Path::new(&name).extension().is_some() {
        return name;
    }
    let ext = mime_type
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|exts| exts.first().copied())
        .or_else(|| infer::get(bytes).map(|kind| kind.extension()))
        .unwrap_or("bin");
    format!("{name}.{ext}")
}
