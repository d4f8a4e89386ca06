//! Output path allocation
//!
//! A page's file name is a pure function of its canonical URL. Path segments
//! are joined with `__`, lowercased and given an `.md` extension. Whenever
//! that flattening could lose information, an 8-hex-digit SHA-256 prefix of
//! the full URL is appended so distinct URLs never share a file.

use crate::url::CanonicalUrl;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;

/// Longest file stem (without suffix and extension) kept verbatim
const MAX_STEM_LEN: usize = 150;

const SEGMENT_SEPARATOR: &str = "__";

/// Names some filesystems refuse regardless of extension
const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Result of an allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub path: PathBuf,
    /// True when the flattened name was already issued to another URL
    pub collision: bool,
}

/// Computes the output file name for a URL
///
/// `primary_origin` is `scheme://host[:port]` of the mirrored site; pages
/// from any other origin always carry a hash suffix.
///
/// # Examples
///
/// ```
/// use docs_mirror::output::output_path;
/// use docs_mirror::url::normalize_url;
///
/// let url = normalize_url("https://docs.example.com/docs/plugins/api/x/").unwrap();
/// let path = output_path(&url, "https://docs.example.com");
/// assert_eq!(path.to_str(), Some("docs__plugins__api__x.md"));
/// ```
pub fn output_path(url: &CanonicalUrl, primary_origin: &str) -> PathBuf {
    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();

    let joined = if segments.is_empty() {
        "index".to_string()
    } else {
        segments.join(SEGMENT_SEPARATOR)
    };
    let lowered = joined.to_lowercase();
    let sanitized: String = lowered
        .chars()
        .map(|c| if is_name_char(c) { c } else { '-' })
        .collect();

    let origin = format!("{}://{}", url.as_url().scheme(), url.host_key());
    let lossy = url.query().is_some()
        || origin != primary_origin
        || joined != lowered
        || sanitized != lowered
        || segments.iter().any(|s| {
            s.contains(SEGMENT_SEPARATOR) || s.starts_with('_') || s.ends_with('_')
        })
        || segments == ["index"]
        || RESERVED_NAMES.contains(&sanitized.split('.').next().unwrap_or_default())
        || sanitized.len() > MAX_STEM_LEN;

    if !lossy {
        return PathBuf::from(format!("{}.md", sanitized));
    }

    let mut stem = sanitized;
    stem.truncate(MAX_STEM_LEN);
    PathBuf::from(format!("{}-{}.md", stem, url_digest(url, 8)))
}

/// Hands out output paths and remembers which URL owns each one
#[derive(Debug)]
pub struct PathAllocator {
    primary_origin: String,
    issued: HashMap<PathBuf, CanonicalUrl>,
}

impl PathAllocator {
    pub fn new(primary_origin: impl Into<String>) -> Self {
        Self {
            primary_origin: primary_origin.into(),
            issued: HashMap::new(),
        }
    }

    /// Allocates the path for a URL
    ///
    /// Repeated calls for the same URL return the same path. If a different
    /// URL already owns the computed path, a 16-hex-digit suffix is used
    /// instead and the allocation is flagged as a collision.
    pub fn allocate(&mut self, url: &CanonicalUrl) -> Allocation {
        let path = output_path(url, &self.primary_origin);

        match self.issued.get(&path) {
            Some(owner) if owner != url => {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("page")
                    .to_string();
                let fallback = path.with_file_name(format!("{}-{}.md", stem, url_digest(url, 16)));
                tracing::warn!(
                    "Path collision: {} and {} both map to {}; using {}",
                    owner,
                    url,
                    path.display(),
                    fallback.display()
                );
                self.issued.insert(fallback.clone(), url.clone());
                Allocation {
                    path: fallback,
                    collision: true,
                }
            }
            _ => {
                self.issued.insert(path.clone(), url.clone());
                Allocation {
                    path,
                    collision: false,
                }
            }
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
}

/// First `len` hex digits of the SHA-256 of the full URL
fn url_digest(url: &CanonicalUrl, len: usize) -> String {
    let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));
    digest[..len].to_string()
}
