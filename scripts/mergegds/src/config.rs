use std::path::Path;

use arcstr::ArcStr;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::conflict::CellConflict;
use crate::error::{with_err_context, ErrorContext, Result};

/// Options controlling how libraries are merged into a layout.
///
/// Every field has a default, so a config file may set any subset of them:
/// ```toml
/// conflict = "rename-cell"
/// libname = "merged"
/// ```
#[derive(Debug, Default, Clone, Eq, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeOptions {
    /// Resolution of cells defined in both the layout and an incoming library.
    #[builder(default)]
    pub conflict: CellConflict,
    /// Name of the written library. Defaults to the first input's library name.
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libname: Option<ArcStr>,
}

impl MergeOptions {
    #[inline]
    pub fn builder() -> MergeOptionsBuilder {
        MergeOptionsBuilder::default()
    }

    /// Parses options from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Loads options from the TOML file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ctx = || ErrorContext::ReadFile(path.to_path_buf());
        let s = with_err_context(std::fs::read_to_string(path), ctx)?;
        with_err_context(Self::from_toml(&s), ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_files() {
        let opts = MergeOptions::from_toml("conflict = \"skip-new-cell\"").unwrap();
        assert_eq!(opts.conflict, CellConflict::SkipNewCell);
        assert_eq!(opts.libname, None);

        let opts = MergeOptions::from_toml("").unwrap();
        assert_eq!(opts, MergeOptions::default());

        assert!(MergeOptions::from_toml("confict = \"rename-cell\"").is_err());
    }

    #[test]
    fn builds() {
        let opts = MergeOptions::builder()
            .conflict(CellConflict::RenameCell)
            .libname("merged")
            .build()
            .unwrap();
        assert_eq!(opts.libname.as_deref(), Some("merged"));
        assert_eq!(MergeOptions::builder().build().unwrap(), MergeOptions::default());
    }
}
