//! One-time discovery of the Tesseract language data directory.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Where a tessdata directory was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TessdataOrigin {
    Flag,
    Config,
    Environment,
    DataDir,
    WorkingDir,
}

impl fmt::Display for TessdataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TessdataOrigin::Flag => "--tessdata",
            TessdataOrigin::Config => "config ocr.tessdata_dir",
            TessdataOrigin::Environment => "TESSDATA_PREFIX",
            TessdataOrigin::DataDir => "user data directory",
            TessdataOrigin::WorkingDir => "./tessdata",
        };
        write!(f, "{}", name)
    }
}

/// A resolved tessdata directory.
#[derive(Debug, Clone)]
pub struct Tessdata {
    pub path: PathBuf,
    pub origin: TessdataOrigin,
}

impl Tessdata {
    /// Language codes with a `.traineddata` file, sorted.
    pub fn languages(&self) -> Vec<String> {
        list_languages(&self.path)
    }

    /// Whether every `+`-separated language in `language` is installed.
    pub fn has_language(&self, language: &str) -> bool {
        let installed = self.languages();
        language
            .split('+')
            .filter(|l| !l.is_empty())
            .all(|l| installed.iter().any(|i| i == l))
    }
}

/// Resolve the tessdata directory from the usual places, in order.
pub fn discover_tessdata(flag: Option<&Path>, configured: Option<&Path>) -> Option<Tessdata> {
    let env = std::env::var_os("TESSDATA_PREFIX");
    let data_dir = dirs::data_dir().map(|d| d.join("asientos").join("tessdata"));
    resolve(candidates(flag, configured, env, data_dir))
}

fn candidates(
    flag: Option<&Path>,
    configured: Option<&Path>,
    env: Option<OsString>,
    data_dir: Option<PathBuf>,
) -> Vec<(PathBuf, TessdataOrigin)> {
    let mut out = Vec::new();

    if let Some(path) = flag {
        out.push((path.to_path_buf(), TessdataOrigin::Flag));
    }
    if let Some(path) = configured {
        out.push((path.to_path_buf(), TessdataOrigin::Config));
    }
    if let Some(prefix) = env.filter(|p| !p.is_empty()) {
        let prefix = PathBuf::from(prefix);
        // Older installs point the prefix at the parent of tessdata/
        out.push((prefix.join("tessdata"), TessdataOrigin::Environment));
        out.push((prefix, TessdataOrigin::Environment));
    }
    if let Some(path) = data_dir {
        out.push((path, TessdataOrigin::DataDir));
    }
    out.push((PathBuf::from("tessdata"), TessdataOrigin::WorkingDir));

    out
}

fn resolve(candidates: Vec<(PathBuf, TessdataOrigin)>) -> Option<Tessdata> {
    for (path, origin) in candidates {
        if !path.is_dir() {
            if matches!(origin, TessdataOrigin::Flag | TessdataOrigin::Config) {
                warn!("Tessdata directory {} ({}) does not exist", path.display(), origin);
            }
            continue;
        }

        // The environment prefix may name a directory without language data
        if origin == TessdataOrigin::Environment && list_languages(&path).is_empty() {
            continue;
        }

        debug!("Using tessdata at {} ({})", path.display(), origin);
        return Some(Tessdata { path, origin });
    }

    None
}

fn list_languages(dir: &Path) -> Vec<String> {
    let mut languages: Vec<String> = fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("traineddata") {
                path.file_stem().and_then(|s| s.to_str()).map(String::from)
            } else {
                None
            }
        })
        .collect();
    languages.sort();
    languages
}
