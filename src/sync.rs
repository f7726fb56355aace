// Sync module
// Resolves the slideshow's current file and writes its stem into the text source

use crate::host::{CallData, Host, Source};
use crate::settings::Settings;
use crate::sources::{is_slideshow_source, is_text_source, SLIDESHOW_ID, TEXT_IDS};
use log::debug;
use thiserror::Error;

/// Procedure the slideshow exposes for its live playback position
const CURRENT_INDEX_PROC: &str = "current_index";

/// Which side of the binding an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Slideshow,
    Text,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Slideshow => write!(f, "slideshow"),
            Role::Text => write!(f, "text"),
        }
    }
}

/// Reasons a resync left the text source untouched
#[derive(Debug, Error, PartialEq)]
pub enum SyncError {
    #[error("no slideshow/text pair is bound")]
    Unbound,

    #[error("the bound {role} source no longer exists")]
    SourceGone { role: Role },

    #[error("source '{name}' is not a {expected} source")]
    WrongType { name: String, expected: String },

    #[error("no file at index {index:?} of {len} file(s)")]
    NoCurrentItem { index: Option<usize>, len: usize },

    #[error("file path '{0}' has no usable name")]
    NoStem(String),
}

/// Weak handles to the bound pair, re-resolved on every sync
pub struct BoundPair<W> {
    pub slideshow: Option<W>,
    pub text: Option<W>,
}

impl<W> Default for BoundPair<W> {
    fn default() -> Self {
        Self {
            slideshow: None,
            text: None,
        }
    }
}

impl<W> BoundPair<W> {
    pub fn clear(&mut self) {
        self.slideshow = None;
        self.text = None;
    }
}

/// Ask the slideshow for the index it is showing right now
///
/// The persisted `cur_index` setting only changes when the source is saved,
/// so the live procedure is the only reliable answer during playback.
pub fn current_index<S: Source>(source: &S) -> Option<usize> {
    let mut data = CallData::new();
    if !source.call(CURRENT_INDEX_PROC, &mut data) {
        return None;
    }
    usize::try_from(data.int(CURRENT_INDEX_PROC)).ok()
}

/// Path of the file at `index`, if there is one
pub fn file_at(files: &[Settings], index: usize) -> Option<&str> {
    files
        .get(index)
        .map(|item| item.get_string("value"))
        .filter(|path| !path.is_empty())
}

/// Path of the file the slideshow is showing right now
pub fn current_file<S: Source>(source: &S) -> Result<String, SyncError> {
    let settings = source.settings();
    let files = settings.get_array("files");
    let index = current_index(source);

    index
        .and_then(|index| file_at(files, index))
        .map(str::to_string)
        .ok_or(SyncError::NoCurrentItem {
            index,
            len: files.len(),
        })
}

/// File name without directory or final extension
///
/// Both separators are honoured since the host may hand over Windows paths.
/// Trailing separators are ignored, a leading dot does not start an extension
/// and a trailing dot is kept.
pub fn file_stem(path: &str) -> Option<String> {
    let name = path
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())?;
    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 && dot < name.len() - 1 => &name[..dot],
        _ => name,
    };
    Some(stem.to_string())
}

/// Write the current slide's name into the bound text source
///
/// Returns the text that was written. Every error leaves the text source as
/// it was; callers treat them as a skipped update.
pub fn sync_text<H: Host>(host: &H, pair: &BoundPair<H::Weak>) -> Result<String, SyncError> {
    let (Some(slideshow_weak), Some(text_weak)) = (&pair.slideshow, &pair.text) else {
        return Err(SyncError::Unbound);
    };

    // Both upgrades happen before either check so a resolved handle is always
    // released on the early-return paths as well
    let slideshow = host.upgrade(slideshow_weak);
    let text = host.upgrade(text_weak);

    let Some(slideshow) = slideshow else {
        return Err(SyncError::SourceGone {
            role: Role::Slideshow,
        });
    };
    let Some(text) = text else {
        return Err(SyncError::SourceGone { role: Role::Text });
    };

    if !is_slideshow_source(Some(&slideshow)) {
        return Err(SyncError::WrongType {
            name: slideshow.name(),
            expected: SLIDESHOW_ID.to_string(),
        });
    }
    if !is_text_source(Some(&text)) {
        return Err(SyncError::WrongType {
            name: text.name(),
            expected: TEXT_IDS.join("/"),
        });
    }

    let path = current_file(&slideshow)?;
    let stem = file_stem(&path).ok_or_else(|| SyncError::NoStem(path.clone()))?;

    let mut update = Settings::new();
    update.set_string("text", stem.as_str());
    text.update(&update);

    debug!("Set '{}' to '{}' from {}", text.name(), stem, path);
    Ok(stem)
}
