use std::fmt;

use chrono::Utc;
use rand::distributions::{Alphanumeric, DistString};
use rand::thread_rng;
use serde::{Deserialize, Serialize};

pub const SEPARATOR: char = '/';

const STAGING_SUFFIX: &str = "_new";
const BACKUP_SUFFIX: &str = "_old";

/// Collapses repeated separators and resolves `.` and `..` segments.
///
/// Absolute paths stay absolute and can never climb above the root. Relative
/// paths keep leading `..` segments, and an empty relative path becomes `.`.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with(SEPARATOR);
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_owned()
    } else {
        joined
    }
}

pub fn join(base: &str, relative: &str) -> String {
    if base.is_empty() {
        return normalize(relative);
    }
    normalize(&format!("{}{}{}", base, SEPARATOR, relative))
}

/// Parent directory of a path, or `None` for the root and for `.`.
pub fn parent(path: &str) -> Option<String> {
    let path = normalize(path);
    if path == "/" || path == "." {
        return None;
    }
    match path.rsplit_once(SEPARATOR) {
        Some(("", _)) => Some("/".to_owned()),
        Some((parent, _)) => Some(parent.to_owned()),
        None => Some(".".to_owned()),
    }
}

pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATOR);
    match trimmed.rsplit_once(SEPARATOR) {
        Some((_, name)) => name,
        None => trimmed,
    }
}

/// Number of segments below the root.
pub fn depth(path: &str) -> usize {
    let path = normalize(path);
    if path == "/" || path == "." {
        return 0;
    }
    path.trim_start_matches(SEPARATOR).split(SEPARATOR).count()
}

/// Every prefix of `path`, shallowest first, excluding the root itself.
///
/// `/a/b/c` yields `/a`, `/a/b`, `/a/b/c`.
pub fn ancestors(path: &str) -> Vec<String> {
    let path = normalize(path);
    if path == "/" || path == "." {
        return vec![];
    }
    let absolute = path.starts_with(SEPARATOR);
    let mut current = if absolute { String::from("/") } else { String::new() };
    let mut result = Vec::new();

    for segment in path.trim_start_matches(SEPARATOR).split(SEPARATOR) {
        if !current.is_empty() && !current.ends_with(SEPARATOR) {
            current.push(SEPARATOR);
        }
        current.push_str(segment);
        result.push(current.clone());
    }
    result
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFolder {
    Data,
    Logos,
    Pdfs,
}

impl ContentFolder {
    pub const ALL: [ContentFolder; 3] = [ContentFolder::Data, ContentFolder::Logos, ContentFolder::Pdfs];

    pub fn name(&self) -> &'static str {
        match self {
            ContentFolder::Data => "data",
            ContentFolder::Logos => "logos",
            ContentFolder::Pdfs => "pdfs",
        }
    }

    /// Only the bare folder names route. `data_new` or `logos_old` never do.
    pub fn from_segment(segment: &str) -> Option<ContentFolder> {
        ContentFolder::ALL
            .into_iter()
            .find(|folder| folder.name() == segment)
    }
}

impl fmt::Display for ContentFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generation {
    Live,
    Staging,
    Backup,
}

/// Suffix distinguishing the staging roots of one deployment run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagingToken(String);

impl StagingToken {
    pub fn generate() -> StagingToken {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let nonce = Alphanumeric.sample_string(&mut thread_rng(), 5);
        StagingToken(format!("{}_{}", stamp, nonce))
    }

    pub fn new(token: &str) -> Option<StagingToken> {
        let valid = !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        valid.then(|| StagingToken(token.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn directory_name(folder: ContentFolder, generation: Generation, token: Option<&StagingToken>) -> String {
    match (generation, token) {
        (Generation::Live, _) => folder.name().to_owned(),
        (Generation::Staging, None) => format!("{}{}", folder.name(), STAGING_SUFFIX),
        (Generation::Staging, Some(token)) => {
            format!("{}{}_{}", folder.name(), STAGING_SUFFIX, token.as_str())
        }
        (Generation::Backup, _) => format!("{}{}", folder.name(), BACKUP_SUFFIX),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    MissingFolder(String),
    UnknownFolder(String),
    EscapesFolder(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::MissingFolder(path) => write!(f, "Remote path {} has no content folder", path),
            PathError::UnknownFolder(segment) => write!(f, "Unknown content folder: {}", segment),
            PathError::EscapesFolder(path) => write!(f, "Remote path {} leaves its content folder", path),
        }
    }
}

impl std::error::Error for PathError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPath {
    pub folder: ContentFolder,
    pub path: String,
}

/// Maps a logical path such as `logos/2.png` onto the staging root of its
/// content folder below `base`.
pub fn map_to_staging(
    base: &str,
    logical: &str,
    token: Option<&StagingToken>,
) -> Result<StagedPath, PathError> {
    let logical = normalize(logical);
    let relative = logical.trim_start_matches(SEPARATOR);
    let (segment, rest) = relative
        .split_once(SEPARATOR)
        .ok_or_else(|| PathError::MissingFolder(logical.clone()))?;
    if segment == ".." {
        return Err(PathError::EscapesFolder(logical.clone()));
    }
    let folder = ContentFolder::from_segment(segment)
        .ok_or_else(|| PathError::UnknownFolder(segment.to_owned()))?;

    let staging_root = directory_name(folder, Generation::Staging, token);
    Ok(StagedPath {
        folder,
        path: join(base, &format!("{}{}{}", staging_root, SEPARATOR, rest)),
    })
}

/// Physical placement of the content folders of one environment for one run.
#[derive(Clone, Debug)]
pub struct FolderLayout {
    base: String,
    token: Option<StagingToken>,
}

impl FolderLayout {
    pub fn new(base: &str, token: Option<StagingToken>) -> FolderLayout {
        FolderLayout {
            base: normalize(base),
            token,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn token(&self) -> Option<&StagingToken> {
        self.token.as_ref()
    }

    pub fn folder_path(&self, folder: ContentFolder, generation: Generation) -> String {
        join(
            &self.base,
            &directory_name(folder, generation, self.token.as_ref()),
        )
    }

    pub fn staging_path(&self, logical: &str) -> Result<StagedPath, PathError> {
        map_to_staging(&self.base, logical, self.token.as_ref())
    }

    pub fn staging_roots(&self) -> impl Iterator<Item = String> + '_ {
        ContentFolder::ALL
            .into_iter()
            .map(|folder| self.folder_path(folder, Generation::Staging))
    }
}
