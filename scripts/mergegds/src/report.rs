//! Summaries of what each read and merge did.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arcstr::ArcStr;
use gds21::ser::{SerdeFile, SerializationFormat};
use gds21::GdsStats;
use serde::{Deserialize, Serialize};

use crate::error::{with_err_context, ErrorContext, Result};

/// The outcome of merging one library into a [`Layout`](crate::layout::Layout).
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReadReport {
    /// Source file, if the library was read from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Number of cells defined by the incoming library.
    pub cells_read: usize,
    /// Incoming cells added under their own names.
    pub added: Vec<ArcStr>,
    /// Existing cells the incoming elements were appended to.
    pub merged: Vec<ArcStr>,
    /// Existing cells whose contents were replaced.
    pub overwritten: Vec<ArcStr>,
    /// Incoming cells that were dropped.
    pub skipped: Vec<ArcStr>,
    /// Incoming cells added under new names, keyed by original name.
    pub renamed: BTreeMap<ArcStr, ArcStr>,
    /// Cells removed after becoming unreferenced.
    pub pruned: Vec<ArcStr>,
    /// Factor incoming coordinates were multiplied by, if units differed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,
    /// Names instantiated but defined nowhere, after the read.
    pub dangling: Vec<ArcStr>,
}

/// The outcome of a complete merge-and-write run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Path the merged layout was written to.
    pub output: PathBuf,
    /// Per-input reports, in read order.
    pub inputs: Vec<ReadReport>,
    /// Element statistics of the written layout.
    pub stats: GdsStats,
}

impl SerdeFile for ReadReport {}
impl SerdeFile for MergeReport {}

impl MergeReport {
    /// Saves the report to `path`, in the text format its extension names.
    ///
    /// Unrecognized extensions are written as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        with_err_context(self.save_as(summary_format(path), path), || {
            ErrorContext::CreateFile(path.to_path_buf())
        })
    }

    /// Loads a report written by [`MergeReport::save`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        with_err_context(Self::open_as(path, summary_format(path)), || {
            ErrorContext::ReadFile(path.to_path_buf())
        })
    }
}

fn summary_format(path: &Path) -> SerializationFormat {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("yaml") | Some("yml") => SerializationFormat::Yaml,
        Some("toml") => SerializationFormat::Toml,
        _ => SerializationFormat::Json,
    }
}
