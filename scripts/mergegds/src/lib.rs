//! Merge GDS layout files.
//!
//! A base layout is read into a [`Layout`], each patch layout is read into the
//! same [`Layout`], and the result is written out. Cells defined by more than one
//! input are resolved per [`CellConflict`].

use std::path::Path;

pub mod config;
pub mod conflict;
pub mod error;
pub mod format;
pub mod hierarchy;
pub mod layout;
pub mod report;
pub mod units;

pub use config::MergeOptions;
pub use conflict::CellConflict;
pub use error::{MergeError, Result};
pub use layout::Layout;
pub use report::{MergeReport, ReadReport};

use error::{with_err_context, ErrorContext, ErrorSource};

/// Reads `infile`, reads `patch` into the same layout, and writes the result to `outfile`.
pub fn patch(
    infile: impl AsRef<Path>,
    patch: impl AsRef<Path>,
    outfile: impl AsRef<Path>,
) -> Result<()> {
    let mut layout = Layout::new();
    layout.read(infile)?;
    layout.read(patch)?;
    layout.write(outfile)?;
    Ok(())
}

/// Merges `inputs` into `output` with default options.
///
/// The first input is the base layout; the rest are applied on top of it, in order.
pub fn merge<T: AsRef<Path>>(
    output: impl AsRef<Path>,
    inputs: impl IntoIterator<Item = T>,
) -> Result<()> {
    merge_with(output, inputs, &MergeOptions::default())?;
    Ok(())
}

/// Merges `inputs` into `output`, returning a report of what each read did.
pub fn merge_with<T: AsRef<Path>>(
    output: impl AsRef<Path>,
    inputs: impl IntoIterator<Item = T>,
    opts: &MergeOptions,
) -> Result<MergeReport> {
    let output = output.as_ref();
    let inputs: Vec<T> = inputs.into_iter().collect();
    if inputs.is_empty() {
        return Err(ErrorSource::InvalidArgs("at least one input layout is required".into()).into());
    }

    let inner = || -> Result<MergeReport> {
        let mut layout = Layout::with_conflict(opts.conflict);
        let mut reports = Vec::with_capacity(inputs.len());
        for input in inputs.iter() {
            reports.push(layout.read(input)?);
        }
        if let Some(ref name) = opts.libname {
            layout.set_name(name.clone());
        }
        layout.write(output)?;
        Ok(MergeReport {
            output: output.to_path_buf(),
            inputs: reports,
            stats: layout.stats(),
        })
    };
    with_err_context(inner(), || {
        ErrorContext::Task(arcstr::format!(
            "merging {} layouts into {:?}",
            inputs.len(),
            output
        ))
    })
}
