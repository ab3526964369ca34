//! The in-memory layout that libraries are read into and written from.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use arcstr::ArcStr;
use gds21::{GdsLibrary, GdsStats, GdsStruct, GdsUnits};
use log::{debug, info, warn};
use tempfile::NamedTempFile;

use crate::conflict::CellConflict;
use crate::error::{with_err_context, ErrorContext, ErrorSource, Result};
use crate::format::LayoutFormat;
use crate::hierarchy::Hierarchy;
use crate::report::ReadReport;
use crate::units::{scale_factor, scale_library};

/// Library name of a layout nothing has been read into.
pub const DEFAULT_LIBNAME: &str = "LIB";

/// A single in-memory layout.
///
/// Each read merges a library into the layout. The first read adopts the
/// incoming library wholesale, header included; later reads keep the layout's
/// header and units, and resolve cell-name conflicts per [`CellConflict`].
#[derive(Debug, Clone)]
pub struct Layout {
    lib: GdsLibrary,
    conflict: CellConflict,
    /// Whether any library has been read in yet.
    loaded: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

impl Layout {
    /// Creates an empty layout with default units.
    pub fn new() -> Self {
        Self {
            lib: GdsLibrary::new(DEFAULT_LIBNAME),
            conflict: CellConflict::default(),
            loaded: false,
        }
    }

    /// Creates an empty layout that resolves cell-name conflicts with `conflict`.
    pub fn with_conflict(conflict: CellConflict) -> Self {
        Self {
            conflict,
            ..Self::new()
        }
    }

    pub fn conflict(&self) -> CellConflict {
        self.conflict
    }

    pub fn set_conflict(&mut self, conflict: CellConflict) {
        self.conflict = conflict;
    }

    /// Reads the layout file at `path` and merges it into this layout.
    ///
    /// The file format is inferred from the extension. On error, the layout is unchanged.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<ReadReport> {
        let path = path.as_ref();
        let ctx = || ErrorContext::ReadFile(path.to_path_buf());
        let fmt = LayoutFormat::from_path(path);
        let lib = with_err_context(fmt.load(path), ctx)?;
        let mut report = with_err_context(self.read_library(lib), ctx)?;
        info!(
            "read {} cells from {:?} into layout {}",
            report.cells_read, path, self.lib.name
        );
        report.path = Some(path.to_path_buf());
        Ok(report)
    }

    /// Merges an in-memory library into this layout.
    ///
    /// On error, the layout is unchanged.
    pub fn read_library(&mut self, incoming: GdsLibrary) -> Result<ReadReport> {
        check_unique_names(&incoming)?;
        let mut report = ReadReport {
            cells_read: incoming.structs.len(),
            ..Default::default()
        };

        let merged = if self.loaded {
            let mut merged = self.lib.clone();
            self.merge_into(&mut merged, incoming, &mut report)?;
            merged
        } else {
            report.added = incoming.structs.iter().map(|s| s.name.clone()).collect();
            incoming
        };

        let hierarchy = Hierarchy::new(&merged);
        if let Some(cycle) = hierarchy.find_cycle() {
            return Err(ErrorSource::CyclicReference(cycle).into());
        }
        report.dangling = hierarchy.dangling();
        for name in report.dangling.iter() {
            warn!("cell {name} is instantiated but never defined");
        }

        self.lib = merged;
        self.loaded = true;
        Ok(report)
    }

    /// Merges `incoming` into `merged`, a working copy of this layout's library.
    fn merge_into(
        &self,
        merged: &mut GdsLibrary,
        mut incoming: GdsLibrary,
        report: &mut ReadReport,
    ) -> Result<()> {
        if let Some(factor) = scale_factor(&merged.units, &incoming.units)? {
            warn!(
                "scaling coordinates of library {} by {factor} to match database unit {:e} m",
                incoming.name,
                merged.units.db_unit()
            );
            scale_library(&mut incoming, factor)?;
            report.scale = Some(factor);
        }

        let existing: HashSet<ArcStr> = merged.structs.iter().map(|s| s.name.clone()).collect();
        let conflicts: HashSet<ArcStr> = incoming
            .structs
            .iter()
            .filter(|s| existing.contains(&s.name))
            .map(|s| s.name.clone())
            .collect();
        if !conflicts.is_empty() {
            debug!(
                "resolving {} conflicting cells from library {} with policy {}",
                conflicts.len(),
                incoming.name,
                self.conflict
            );
        }

        match self.conflict {
            CellConflict::AddToCell => add_to_cells(merged, incoming, report),
            CellConflict::OverwriteCell => overwrite_cells(merged, incoming, &conflicts, report),
            CellConflict::SkipNewCell => skip_new_cells(merged, incoming, &conflicts, report),
            CellConflict::RenameCell => {
                rename_cells(merged, incoming, &existing, &conflicts, report)
            }
        }
        Ok(())
    }

    /// Writes this layout to `path`, in the format its extension names.
    ///
    /// The data goes to a temporary file next to `path`, which is then renamed over it.
    /// An existing file's permissions carry over to the new one.
    /// On error, nothing is left at `path` and an existing file there is untouched.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let ctx = || ErrorContext::CreateFile(path.to_path_buf());
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = with_err_context(output_tempfile(dir), ctx)?;
        // An existing output keeps its mode; a new one gets the usual umask-filtered default
        if let Ok(meta) = fs::metadata(path) {
            with_err_context(tmp.as_file().set_permissions(meta.permissions()), ctx)?;
        }
        let fmt = LayoutFormat::from_path(path);
        with_err_context(
            fmt.write_to(&self.lib, BufWriter::new(tmp.as_file_mut())),
            ctx,
        )?;
        with_err_context(tmp.persist(path).map_err(|err| err.error), ctx)?;
        info!(
            "wrote {} cells of layout {} to {:?}",
            self.lib.structs.len(),
            self.lib.name,
            path
        );
        Ok(())
    }

    pub fn cell(&self, name: &str) -> Option<&GdsStruct> {
        self.lib.find_struct(name)
    }

    /// All cells, in declaration order.
    pub fn cells(&self) -> &[GdsStruct] {
        &self.lib.structs
    }

    pub fn cell_names(&self) -> impl Iterator<Item = &ArcStr> + '_ {
        self.lib.structs.iter().map(|s| &s.name)
    }

    /// Cells instantiated by no other cell.
    pub fn top_cells(&self) -> Vec<ArcStr> {
        Hierarchy::new(&self.lib).top_cells()
    }

    pub fn units(&self) -> GdsUnits {
        self.lib.units
    }

    pub fn name(&self) -> &ArcStr {
        &self.lib.name
    }

    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.lib.name = name.into();
    }

    pub fn library(&self) -> &GdsLibrary {
        &self.lib
    }

    pub fn into_library(self) -> GdsLibrary {
        self.lib
    }

    pub fn stats(&self) -> GdsStats {
        self.lib.stats()
    }

    /// Whether the layout has no cells.
    pub fn is_empty(&self) -> bool {
        self.lib.structs.is_empty()
    }
}

/// A temporary file in `dir`, created with the mode a plain `File::create` would use.
#[cfg(unix)]
fn output_tempfile(dir: &Path) -> std::io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;
    tempfile::Builder::new()
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn output_tempfile(dir: &Path) -> std::io::Result<NamedTempFile> {
    NamedTempFile::new_in(dir)
}

fn check_unique_names(lib: &GdsLibrary) -> Result<()> {
    let mut seen = HashSet::with_capacity(lib.structs.len());
    for strukt in lib.structs.iter() {
        if !seen.insert(&strukt.name) {
            return Err(ErrorSource::DuplicateCell(strukt.name.clone()).into());
        }
    }
    Ok(())
}

fn index_of(lib: &GdsLibrary) -> HashMap<ArcStr, usize> {
    lib.structs
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.clone(), i))
        .collect()
}

/// Appends the elements of each conflicting cell to the existing one.
fn add_to_cells(merged: &mut GdsLibrary, incoming: GdsLibrary, report: &mut ReadReport) {
    let index = index_of(merged);
    for strukt in incoming.structs {
        match index.get(&strukt.name) {
            Some(&i) => {
                debug!("appending {} elements to cell {}", strukt.elems.len(), strukt.name);
                report.merged.push(strukt.name.clone());
                merged.structs[i].elems.extend(strukt.elems);
            }
            None => {
                report.added.push(strukt.name.clone());
                merged.structs.push(strukt);
            }
        }
    }
}

/// Replaces the contents of each conflicting cell, then removes existing cells
/// that were only instantiated through the replaced contents.
fn overwrite_cells(
    merged: &mut GdsLibrary,
    incoming: GdsLibrary,
    conflicts: &HashSet<ArcStr>,
    report: &mut ReadReport,
) {
    let old = Hierarchy::new(merged);
    let incoming_names: HashSet<ArcStr> =
        incoming.structs.iter().map(|s| s.name.clone()).collect();
    let mut candidates: HashSet<ArcStr> = conflicts
        .iter()
        .flat_map(|name| old.reachable_from(old.children(name), |_| true))
        .filter(|name| !incoming_names.contains(name))
        .collect();

    let index = index_of(merged);
    for strukt in incoming.structs {
        match index.get(&strukt.name) {
            Some(&i) => {
                debug!("overwriting cell {}", strukt.name);
                report.overwritten.push(strukt.name.clone());
                merged.structs[i].elems = strukt.elems;
            }
            None => {
                report.added.push(strukt.name.clone());
                merged.structs.push(strukt);
            }
        }
    }

    // Removing one orphan may orphan its own children
    loop {
        let referenced = Hierarchy::new(merged).referenced();
        let orphans: HashSet<ArcStr> = candidates
            .iter()
            .filter(|name| !referenced.contains(*name))
            .cloned()
            .collect();
        if orphans.is_empty() {
            break;
        }
        for name in merged
            .structs
            .iter()
            .map(|s| &s.name)
            .filter(|name| orphans.contains(*name))
        {
            debug!("removing cell {name}, no longer instantiated");
            report.pruned.push(name.clone());
        }
        merged.structs.retain(|s| !orphans.contains(&s.name));
        candidates.retain(|name| !orphans.contains(name));
    }
}

/// Drops each conflicting incoming cell, along with incoming cells
/// only instantiated through dropped ones.
fn skip_new_cells(
    merged: &mut GdsLibrary,
    incoming: GdsLibrary,
    conflicts: &HashSet<ArcStr>,
    report: &mut ReadReport,
) {
    let hierarchy = Hierarchy::new(&incoming);
    let not_conflicting = |name: &str| !conflicts.contains(name);
    let below_conflicts: HashSet<ArcStr> = hierarchy
        .reachable_from(
            hierarchy
                .cells()
                .iter()
                .filter(|name| conflicts.contains(*name))
                .flat_map(|name| hierarchy.children(name)),
            &not_conflicting,
        )
        .into_iter()
        .collect();
    // Anything not under a conflicting cell is kept, along with whatever it instantiates
    let roots: Vec<&ArcStr> = hierarchy
        .cells()
        .iter()
        .filter(|name| !conflicts.contains(*name) && !below_conflicts.contains(*name))
        .collect();
    let keep: HashSet<ArcStr> = hierarchy
        .reachable_from(roots, &not_conflicting)
        .into_iter()
        .collect();
    for strukt in incoming.structs {
        if keep.contains(&strukt.name) {
            report.added.push(strukt.name.clone());
            merged.structs.push(strukt);
        } else {
            debug!("skipping incoming cell {}", strukt.name);
            report.skipped.push(strukt.name);
        }
    }
}

/// Adds each conflicting incoming cell under the first free `{name}_{i}`,
/// rewriting incoming instances to match.
fn rename_cells(
    merged: &mut GdsLibrary,
    mut incoming: GdsLibrary,
    existing: &HashSet<ArcStr>,
    conflicts: &HashSet<ArcStr>,
    report: &mut ReadReport,
) {
    let mut names_used: HashSet<ArcStr> = existing.clone();
    names_used.extend(incoming.structs.iter().map(|s| s.name.clone()));

    let mut renames: HashMap<ArcStr, ArcStr> = HashMap::with_capacity(conflicts.len());
    for strukt in incoming.structs.iter() {
        if !conflicts.contains(&strukt.name) {
            continue;
        }
        let name = &strukt.name;
        let mut i = 1;
        let newname = loop {
            let newname = arcstr::format!("{}_{}", name, i);
            if !names_used.contains(&newname) {
                break newname;
            }
            i += 1;
        };
        debug!("renaming incoming cell {name} to {newname}");
        names_used.insert(newname.clone());
        renames.insert(name.clone(), newname);
    }

    for strukt in incoming.structs.iter_mut() {
        if let Some(newname) = renames.get(&strukt.name) {
            strukt.name = newname.clone();
        }
        for elem in strukt.elems.iter_mut() {
            if let Some(target) = elem.struct_ref_name_mut() {
                if let Some(newname) = renames.get(&*target) {
                    *target = newname.clone();
                }
            }
        }
    }

    let renamed: BTreeMap<ArcStr, ArcStr> = renames.into_iter().collect();
    for strukt in incoming.structs {
        if !renamed.values().any(|n| *n == strukt.name) {
            report.added.push(strukt.name.clone());
        }
        merged.structs.push(strukt);
    }
    report.renamed = renamed;
}
