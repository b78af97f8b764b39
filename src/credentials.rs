//! Loading, prompting for and saving the Mistral API key.

use std::{fmt, fs, io, io::Write as _};

use crate::{
    prelude::*,
    prompting::{InputProvider, non_empty},
};

/// The variable our key is stored under.
pub const API_KEY_VAR: &str = "MISTRAL_API_KEY";

/// Where operators can get a key.
const API_KEY_URL: &str = "https://console.mistral.ai/";

/// An API key. The `Debug` output never includes the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank values.
    pub fn new(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self(value.to_owned()))
        }
    }

    /// The raw key, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// A `.env`-style file holding our key.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read our key from the file. A missing file or variable is not an error.
    pub fn load(&self) -> Result<Option<ApiKey>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let entries = dotenvy::from_path_iter(&self.path)
            .with_context(|| format!("cannot open {:?}", self.path))?;
        for entry in entries {
            match entry {
                Ok((name, value)) if name == API_KEY_VAR => {
                    return Ok(ApiKey::new(&value));
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(path = %self.path.display(), "Skipping unparsable line: {err}");
                }
            }
        }
        Ok(None)
    }

    /// Store `key`, replacing any existing entry and keeping all other lines.
    pub fn save(&self, key: &ApiKey) -> Result<()> {
        let existing = match fs::read_to_string(&self.path) {
            Ok(existing) => existing,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("cannot read {:?}", self.path));
            }
        };

        let entry = format!("{API_KEY_VAR}={}", key.expose());
        let mut lines = vec![];
        let mut replaced = false;
        for line in existing.lines() {
            if !replaced && defines_api_key(line) {
                lines.push(entry.clone());
                replaced = true;
            } else {
                lines.push(line.to_owned());
            }
        }
        if !replaced {
            lines.push(entry);
        }
        let mut contents = lines.join("\n");
        contents.push('\n');
        write_atomically(&self.path, contents.as_bytes())
    }
}

/// Does this `.env` line assign our variable?
fn defines_api_key(line: &str) -> bool {
    let line = line.trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
    line.strip_prefix(API_KEY_VAR)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

/// Replace `path` with `data` without ever leaving a half-written file.
fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("cannot create temporary file in {:?}", dir))?;
    tmp.write_all(data)
        .and_then(|()| tmp.flush())
        .with_context(|| format!("cannot write temporary file for {:?}", path))?;
    tmp.persist(path)
        .with_context(|| format!("cannot replace {:?}", path))?;
    Ok(())
}

/// Find an API key, asking the operator (and remembering the answer) if we
/// have to.
///
/// `explicit` is the value from `--api-key` or the environment, which wins
/// over anything stored.
pub fn resolve_api_key(
    explicit: Option<&str>,
    store: &CredentialStore,
    input: &mut dyn InputProvider,
) -> Result<ApiKey> {
    if let Some(key) = explicit.and_then(ApiKey::new) {
        debug!("Using API key from the command line or environment");
        return Ok(key);
    }
    if let Some(key) = store.load()? {
        debug!(path = %store.path().display(), "Loaded API key");
        return Ok(key);
    }

    warn!(
        path = %store.path().display(),
        "No Mistral API key found; get one at {API_KEY_URL}"
    );
    let answer = input
        .obtain("Enter your Mistral API key:", &non_empty)
        .context("no Mistral API key available")?;
    let key = ApiKey::new(&answer).ok_or_else(|| anyhow!("API key is empty"))?;
    store.save(&key)?;
    info!(path = %store.path().display(), "Saved API key");
    Ok(key)
}
