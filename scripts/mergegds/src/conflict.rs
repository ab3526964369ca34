//! Policies for cells defined in both the layout and an incoming library.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// How a cell name defined in both the layout and an incoming library is resolved.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CellConflict {
    /// Append the incoming cell's elements to the existing cell.
    #[default]
    AddToCell,
    /// Replace the existing cell's contents with the incoming cell's.
    OverwriteCell,
    /// Keep the existing cell and drop the incoming one.
    SkipNewCell,
    /// Rename the incoming cell to an unused name.
    RenameCell,
}

impl Display for CellConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AddToCell => "add-to-cell",
            Self::OverwriteCell => "overwrite-cell",
            Self::SkipNewCell => "skip-new-cell",
            Self::RenameCell => "rename-cell",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use clap::ValueEnum;

    use super::*;

    #[test]
    fn names_agree() {
        for policy in CellConflict::value_variants() {
            let name = policy.to_string();
            assert_eq!(CellConflict::from_str(&name, false).unwrap(), *policy);
            assert_eq!(serde_json::to_string(policy).unwrap(), format!("\"{name}\""));
            let toml_str = format!("policy = \"{name}\"");
            #[derive(Deserialize)]
            struct Wrapper {
                policy: CellConflict,
            }
            let w: Wrapper = toml::from_str(&toml_str).unwrap();
            assert_eq!(w.policy, *policy);
        }
    }
}
