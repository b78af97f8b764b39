//! Finding a system font that can draw CJK text in generated PDFs.

use std::{fmt, fs, sync::OnceLock};

use printpdf::ParsedFont;

use crate::prelude::*;

/// Fonts we try on macOS.
const MACOS_FONTS: &[&str] = &[
    "/System/Library/Fonts/PingFang.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
    "/Library/Fonts/STHeiti Light.ttc",
    "/System/Library/Fonts/STHeiti Light.ttc",
    "/System/Library/Fonts/Hiragino Sans GB.ttc",
];

/// Fonts we try on Linux and other Unix systems.
const UNIX_FONTS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
    "/usr/share/fonts/wenquanyi/wqy-microhei/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
    "/usr/share/fonts/truetype/arphic/uming.ttc",
];

/// Fonts we try on Windows.
const WINDOWS_FONTS: &[&str] = &[
    r"C:\Windows\Fonts\msyh.ttc",
    r"C:\Windows\Fonts\simsun.ttc",
    r"C:\Windows\Fonts\simhei.ttf",
];

/// The default candidates for the platform we were built for.
pub fn platform_candidates() -> Vec<PathBuf> {
    let list = if cfg!(target_os = "macos") {
        MACOS_FONTS
    } else if cfg!(windows) {
        WINDOWS_FONTS
    } else {
        UNIX_FONTS
    };
    list.iter().map(PathBuf::from).collect()
}

/// The font generated PDFs will use.
pub enum FontChoice {
    /// A font file loaded from disk.
    Loaded { path: PathBuf, font: ParsedFont },

    /// PDF's built-in Helvetica, which only covers Latin text.
    Builtin,
}

impl fmt::Debug for FontChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontChoice::Loaded { path, .. } => {
                f.debug_struct("Loaded").field("path", path).finish()
            }
            FontChoice::Builtin => f.write_str("Builtin"),
        }
    }
}

/// Probes an ordered list of font files, once.
pub struct FontLocator {
    candidates: Vec<PathBuf>,
    choice: OnceLock<FontChoice>,
}

impl FontLocator {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            choice: OnceLock::new(),
        }
    }

    /// Try `extra` first, then the platform defaults.
    pub fn with_platform_defaults(extra: &[PathBuf]) -> Self {
        let mut candidates = extra.to_vec();
        candidates.extend(platform_candidates());
        Self::new(candidates)
    }

    /// Pick a font. The first call does the work; later calls return the
    /// same answer.
    pub fn select(&self) -> &FontChoice {
        self.choice.get_or_init(|| self.probe())
    }

    fn probe(&self) -> FontChoice {
        for path in &self.candidates {
            if !path.is_file() {
                trace!(path = %path.display(), "Font not present");
                continue;
            }
            match load_font(path) {
                Ok(font) => {
                    info!(path = %path.display(), "Using font for PDF output");
                    return FontChoice::Loaded {
                        path: path.clone(),
                        font,
                    };
                }
                Err(err) => {
                    warn!(path = %path.display(), "Cannot use font: {err:#}");
                }
            }
        }
        warn!(
            "No CJK font found; PDF output will use Helvetica and CJK characters \
             will be replaced"
        );
        FontChoice::Builtin
    }
}

/// Read and parse a font file. Collections use their first face.
fn load_font(path: &Path) -> Result<ParsedFont> {
    let bytes = fs::read(path).context("cannot read font file")?;
    let mut warnings = Vec::new();
    let font = ParsedFont::from_bytes(&bytes, 0, &mut warnings)
        .ok_or_else(|| anyhow!("cannot parse font file"))?;
    debug!(warnings = warnings.len(), "Parsed font");
    Ok(font)
}
