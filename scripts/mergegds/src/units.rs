//! Database-unit reconciliation between libraries.

use std::convert::TryFrom;

use gds21::{GdsElement, GdsLibrary, GdsPoint, GdsUnits};

use crate::error::{ErrorSource, Result};

/// Relative tolerance when comparing database units.
const UNIT_TOLERANCE: f64 = 1e-9;

/// Determines how coordinates in a library with `incoming` units map onto `layout` units.
///
/// Returns `None` when the database units match, or `Some(factor)` when the incoming
/// database unit is an integer multiple of the layout's. Any other ratio is an error:
/// a coarser layout grid cannot represent the incoming coordinates.
pub fn scale_factor(layout: &GdsUnits, incoming: &GdsUnits) -> Result<Option<i32>> {
    let (ours, theirs) = (layout.db_unit(), incoming.db_unit());
    let incompatible = || ErrorSource::IncompatibleUnits {
        layout: ours,
        incoming: theirs,
    };
    if !(ours > 0.0 && theirs > 0.0) {
        return Err(incompatible().into());
    }
    let ratio = theirs / ours;
    if (ratio - 1.0).abs() <= UNIT_TOLERANCE {
        return Ok(None);
    }
    let rounded = ratio.round();
    if rounded < 2.0 || (ratio - rounded).abs() > UNIT_TOLERANCE * ratio {
        return Err(incompatible().into());
    }
    let factor = i32::try_from(rounded as i64).map_err(|_| incompatible())?;
    Ok(Some(factor))
}

/// Multiplies every spatial quantity in `lib` by `factor`.
///
/// Covers coordinates, path and text widths, and path extensions.
/// Magnifications and angles are dimensionless and left alone.
pub fn scale_library(lib: &mut GdsLibrary, factor: i32) -> Result<()> {
    for strukt in lib.structs.iter_mut() {
        for elem in strukt.elems.iter_mut() {
            scale_element(elem, factor)?;
        }
    }
    Ok(())
}

fn scale_element(elem: &mut GdsElement, factor: i32) -> Result<()> {
    use GdsElement::*;
    match elem {
        GdsBoundary(e) => scale_points(&mut e.xy, factor),
        GdsPath(e) => {
            scale_points(&mut e.xy, factor)?;
            scale_opt(&mut e.width, factor)?;
            scale_opt(&mut e.begin_extn, factor)?;
            scale_opt(&mut e.end_extn, factor)
        }
        GdsStructRef(e) => scale_point(&mut e.xy, factor),
        GdsArrayRef(e) => scale_points(&mut e.xy, factor),
        GdsTextElem(e) => {
            scale_point(&mut e.xy, factor)?;
            scale_opt(&mut e.width, factor)
        }
        GdsNode(e) => scale_points(&mut e.xy, factor),
        GdsBox(e) => scale_points(&mut e.xy, factor),
    }
}

fn scale(value: i32, factor: i32) -> Result<i32> {
    value.checked_mul(factor).ok_or_else(|| {
        ErrorSource::CoordinateOverflow {
            factor,
            value: i64::from(value) * i64::from(factor),
        }
        .into()
    })
}

fn scale_opt(value: &mut Option<i32>, factor: i32) -> Result<()> {
    if let Some(v) = value {
        *v = scale(*v, factor)?;
    }
    Ok(())
}

fn scale_point(pt: &mut GdsPoint, factor: i32) -> Result<()> {
    pt.x = scale(pt.x, factor)?;
    pt.y = scale(pt.y, factor)?;
    Ok(())
}

fn scale_points(pts: &mut [GdsPoint], factor: i32) -> Result<()> {
    for pt in pts.iter_mut() {
        scale_point(pt, factor)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use gds21::{GdsBoundary, GdsPath, GdsStruct};

    use super::*;

    #[test]
    fn factors() {
        let nm = GdsUnits::new(1e-3, 1e-9);
        let um = GdsUnits::new(1.0, 1e-6);
        let half_nm = GdsUnits::new(5e-4, 5e-10);
        assert_eq!(scale_factor(&nm, &nm).unwrap(), None);
        assert_eq!(scale_factor(&nm, &um).unwrap(), Some(1000));
        assert_eq!(scale_factor(&half_nm, &nm).unwrap(), Some(2));
        assert!(matches!(
            scale_factor(&um, &nm).unwrap_err().source(),
            ErrorSource::IncompatibleUnits { .. }
        ));
        let odd = GdsUnits::new(1e-3, 1.5e-9);
        assert!(scale_factor(&nm, &odd).is_err());
    }

    #[test]
    fn scales_everything_spatial() {
        let mut lib = GdsLibrary::new("lib");
        let mut cell = GdsStruct::new("cell");
        cell.elems.push(GdsBoundary::rect(1, 0, (0, 0), (10, 20)).into());
        cell.elems.push(
            GdsPath {
                layer: 2,
                datatype: 0,
                xy: GdsPoint::vec(&[(0, 0), (5, 0)]),
                width: Some(3),
                begin_extn: Some(1),
                ..Default::default()
            }
            .into(),
        );
        lib.structs.push(cell);
        scale_library(&mut lib, 10).unwrap();
        let elems = &lib.structs[0].elems;
        match (&elems[0], &elems[1]) {
            (GdsElement::GdsBoundary(b), GdsElement::GdsPath(p)) => {
                assert_eq!(b.xy[2], GdsPoint::new(100, 200));
                assert_eq!(p.xy[1], GdsPoint::new(50, 0));
                assert_eq!(p.width, Some(30));
                assert_eq!(p.begin_extn, Some(10));
                assert_eq!(p.end_extn, None);
            }
            _ => panic!("unexpected elements"),
        }
    }

    #[test]
    fn overflow() {
        let mut lib = GdsLibrary::new("lib");
        let mut cell = GdsStruct::new("cell");
        cell.elems
            .push(GdsBoundary::rect(1, 0, (0, 0), (i32::MAX / 2, 1)).into());
        lib.structs.push(cell);
        let err = scale_library(&mut lib, 1000).unwrap_err();
        assert!(matches!(
            err.source(),
            ErrorSource::CoordinateOverflow { factor: 1000, .. }
        ));
    }
}
