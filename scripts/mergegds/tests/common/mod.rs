#![allow(dead_code)]

use std::path::{Path, PathBuf};

use arcstr::ArcStr;
use gds21::{
    GdsBoundary, GdsDateTime, GdsDateTimes, GdsElement, GdsLibrary, GdsPoint, GdsStruct,
    GdsStructRef, GdsUnits,
};
use tempfile::TempDir;

/// A fixed timestamp, so that written files are byte-for-byte reproducible.
pub fn dates() -> GdsDateTimes {
    let dt = GdsDateTime {
        year: 123,
        month: 4,
        day: 5,
        hour: 6,
        minute: 7,
        second: 8,
    };
    GdsDateTimes {
        modified: dt,
        accessed: dt,
    }
}

pub fn tmpdir() -> TempDir {
    tempfile::tempdir().expect("failed to create temporary directory")
}

/// A cell holding one rectangle on `layer`.
pub fn rect_cell(name: &str, layer: i16, p0: (i32, i32), p1: (i32, i32)) -> GdsStruct {
    let mut cell = GdsStruct::new(name);
    cell.dates = dates();
    cell.elems.push(GdsBoundary::rect(layer, 0, p0, p1).into());
    cell
}

/// A cell instantiating each of `refs` once, at the origin.
pub fn ref_cell(name: &str, refs: &[&str]) -> GdsStruct {
    let mut cell = GdsStruct::new(name);
    cell.dates = dates();
    for r in refs {
        cell.elems.push(
            GdsStructRef {
                name: (*r).into(),
                xy: GdsPoint::new(0, 0),
                ..Default::default()
            }
            .into(),
        );
    }
    cell
}

pub fn library(name: &str, cells: Vec<GdsStruct>) -> GdsLibrary {
    library_with_units(name, GdsUnits::default(), cells)
}

pub fn library_with_units(name: &str, units: GdsUnits, cells: Vec<GdsStruct>) -> GdsLibrary {
    let mut lib = GdsLibrary::new(name);
    lib.dates = dates();
    lib.units = units;
    lib.structs = cells;
    lib
}

/// Saves `lib` as GDS to `dir/file`, returning the full path.
pub fn write_gds(dir: &Path, file: &str, lib: &GdsLibrary) -> PathBuf {
    let path = dir.join(file);
    lib.save(&path).expect("failed to write GDS file");
    path
}

pub fn open_gds(path: &Path) -> GdsLibrary {
    GdsLibrary::open(path).expect("failed to read GDS file")
}

pub fn cell_names(lib: &GdsLibrary) -> Vec<&str> {
    lib.structs.iter().map(|s| s.name.as_str()).collect()
}

pub fn ref_names(cell: &GdsStruct) -> Vec<&str> {
    cell.struct_ref_names().map(|n| n.as_str()).collect()
}

pub fn boundaries(cell: &GdsStruct) -> Vec<&GdsBoundary> {
    cell.elems
        .iter()
        .filter_map(|e| match e {
            GdsElement::GdsBoundary(b) => Some(b),
            _ => None,
        })
        .collect()
}

pub fn strs(names: &[ArcStr]) -> Vec<&str> {
    names.iter().map(|n| n.as_str()).collect()
}
