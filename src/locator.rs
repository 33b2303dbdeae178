//! Locator parsing
//!
//! Turns a url string into the pieces the format adapters need: the
//! resolved url, the directory it lives in, the file stem and a
//! lower-cased extension.

use thiserror::Error;
use url::Url;

/// Error type for locator parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Locator is empty")]
    Empty,

    #[error("No base directory in {0}")]
    NoBase(String),

    #[error("Cannot resolve {input}: {reason}")]
    Malformed { input: String, reason: String },
}

/// A locator broken into its parts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedFile {
    /// The resolved url, query and fragment included
    pub url: String,
    /// Everything up to and including the last `/`
    pub base: String,
    /// File name as written in the url
    pub file_name: String,
    /// File name without its last extension
    pub stem: String,
    /// Lower-cased last extension, empty when the name has no dot
    pub extension: String,
}

impl ResolvedFile {
    /// Url of another file in the same directory
    pub fn sibling(&self, file_name: &str) -> String {
        format!("{}{}", self.base, file_name)
    }

    /// File name with any query and fragment, as it is fetched
    pub fn request_name(&self) -> &str {
        self.url.get(self.base.len()..).unwrap_or(&self.file_name)
    }

    /// Whether this locator is an inline `data:` uri
    pub fn is_data_uri(&self) -> bool {
        self.url.starts_with("data:")
    }
}

/// Resolves locators, optionally against a base url
#[derive(Debug, Clone, Default)]
pub struct Locator {
    base: Option<Url>,
}

impl Locator {
    /// Create a locator that joins relative input onto `base`
    pub fn new(base: Option<Url>) -> Self {
        Self { base }
    }

    /// The base url relative input is resolved against
    pub fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// Resolve `input` and split it into base, stem and extension
    pub fn resolve(&self, input: &str) -> Result<ResolvedFile, ResolveError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ResolveError::Empty);
        }

        if input.starts_with("data:") {
            return Ok(parse_data_uri(input));
        }

        let url = self.absolutize(input)?;
        split_url(url)
    }

    fn absolutize(&self, input: &str) -> Result<String, ResolveError> {
        if is_absolute(input) {
            return Ok(input.to_string());
        }

        let drive = drive_path(input);
        match &self.base {
            // drive paths are rooted at the base's host
            Some(base) => base
                .join(&drive.map_or_else(|| input.to_string(), |path| format!("/{path}")))
                .map(|joined| joined.to_string())
                .map_err(|e| ResolveError::Malformed {
                    input: input.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(drive.unwrap_or_else(|| input.to_string())),
        }
    }
}

/// Parse a locator without a base url
///
/// Relative input is kept as written, so `"models/chair.obj"` yields
/// base `"models/"`, stem `"chair"` and extension `"obj"`.
pub fn parse_url(input: &str) -> Result<ResolvedFile, ResolveError> {
    Locator::default().resolve(input)
}

fn is_absolute(input: &str) -> bool {
    if input.starts_with("//") {
        return true;
    }
    // a one-letter scheme is a drive letter
    matches!(Url::parse(input), Ok(url) if url.scheme().len() > 1)
}

/// `C:/dir/file` or `C:\dir\file`, with forward slashes
fn drive_path(input: &str) -> Option<String> {
    match input.as_bytes() {
        [letter, b':', b'/' | b'\\', ..] if letter.is_ascii_alphabetic() => {
            Some(input.replace('\\', "/"))
        }
        _ => None,
    }
}

fn split_url(url: String) -> Result<ResolvedFile, ResolveError> {
    // query and fragment never take part in the file name
    let path_end = url.find(|c| c == '?' || c == '#').unwrap_or(url.len());
    let path = &url[..path_end];

    let slash = path
        .rfind('/')
        .ok_or_else(|| ResolveError::NoBase(url.clone()))?;

    let base = path[..=slash].to_string();
    let file_name = path[slash + 1..].to_string();
    let (stem, extension) = split_extension(&file_name);

    Ok(ResolvedFile {
        url,
        base,
        file_name,
        stem,
        extension,
    })
}

/// Split on the last dot; earlier dots stay in the stem
fn split_extension(file_name: &str) -> (String, String) {
    match file_name.rfind('.') {
        Some(dot) => (
            file_name[..dot].to_string(),
            file_name[dot + 1..].to_ascii_lowercase(),
        ),
        None => (file_name.to_string(), String::new()),
    }
}

fn parse_data_uri(uri: &str) -> ResolvedFile {
    let header_end = uri.find(|c| c == ';' || c == ',').unwrap_or(uri.len());
    let mime = &uri["data:".len()..header_end];
    let extension = mime
        .split_once('/')
        .map(|(_, subtype)| subtype.split('+').next().unwrap_or(subtype))
        .unwrap_or("")
        .to_ascii_lowercase();

    ResolvedFile {
        url: uri.to_string(),
        base: String::new(),
        file_name: format!("data.{extension}"),
        stem: "data".to_string(),
        extension,
    }
}
