// Source resolution module
// Classifies host sources and builds the selection lists shown to the user

use crate::host::{Host, Source};

/// Sentinel entry heading both selection lists
pub const NO_SOURCE_SELECTED: &str = "--No Source Selected--";

/// Type id of the image slideshow source
pub const SLIDESHOW_ID: &str = "slideshow";

/// Unversioned type ids of the text sources (GDI+ and FreeType 2)
pub const TEXT_IDS: [&str; 2] = ["text_gdiplus", "text_ft2_source"];

/// Candidate names for each selection list, sentinel first
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLists {
    pub slideshows: Vec<String>,
    pub texts: Vec<String>,
}

pub fn is_slideshow_source<S: Source>(source: Option<&S>) -> bool {
    source.is_some_and(|source| source.id() == SLIDESHOW_ID)
}

pub fn is_text_source<S: Source>(source: Option<&S>) -> bool {
    source.is_some_and(|source| TEXT_IDS.contains(&source.unversioned_id().as_str()))
}

/// True when a selection names no source at all
pub fn is_unselected(name: &str) -> bool {
    name.is_empty() || name == NO_SOURCE_SELECTED
}

/// Enumerate the host's sources into slideshow and text candidates
pub fn source_lists<H: Host>(host: &H) -> SourceLists {
    let mut lists = SourceLists {
        slideshows: vec![NO_SOURCE_SELECTED.to_string()],
        texts: vec![NO_SOURCE_SELECTED.to_string()],
    };

    // Handles are released when `sources` drops at the end of this scope
    let sources = host.enum_sources();
    for source in &sources {
        if is_slideshow_source(Some(source)) {
            lists.slideshows.push(source.name());
        } else if is_text_source(Some(source)) {
            lists.texts.push(source.name());
        }
    }

    lists
}
