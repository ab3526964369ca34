//!
//! GDSII stream encoding
//!

// Std-Lib Imports
use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// Crates.io
use byteorder::{BigEndian, WriteBytesExt};

// Local Imports
use crate::data::*;

/// # Gds Writing Helper
/// Encodes [GdsLibrary] trees and individual [GdsRecord]s onto any [Write] destination.
pub struct GdsWriter<W: Write> {
    /// Write Destination
    dest: W,
}
impl GdsWriter<BufWriter<File>> {
    /// Create (or truncate) `fname` and write to it
    pub fn open(fname: impl AsRef<Path>) -> GdsResult<Self> {
        Ok(Self::new(BufWriter::new(File::create(fname)?)))
    }
}
impl<W: Write> GdsWriter<W> {
    /// Write records to `dest`
    pub fn new(dest: W) -> Self {
        Self { dest }
    }
    /// Write a [GdsLibrary] to the destination, and flush it.
    /// Fields are written in the order of the GDSII BNF.
    pub fn write_lib(&mut self, lib: &GdsLibrary) -> GdsResult<()> {
        self.write_record(&GdsRecord::Header {
            version: lib.version,
        })?;
        self.write_record(&GdsRecord::BgnLib {
            dates: lib.dates.encode(),
        })?;
        if let Some(d) = lib.libdirsize {
            self.write_record(&GdsRecord::LibDirSize(d))?;
        }
        if let Some(ref s) = lib.srfname {
            self.write_record(&GdsRecord::SrfName(s.clone()))?;
        }
        self.write_record(&GdsRecord::LibName(lib.name.to_string()))?;
        if let Some(ref s) = lib.reflibs {
            self.write_record(&GdsRecord::RefLibs(s.clone()))?;
        }
        if let Some(ref s) = lib.fonts {
            self.write_record(&GdsRecord::Fonts(s.clone()))?;
        }
        if let Some(ref s) = lib.attrtable {
            self.write_record(&GdsRecord::AttrTable(s.clone()))?;
        }
        if let Some(d) = lib.generations {
            self.write_record(&GdsRecord::Generations(d))?;
        }
        if let Some(GdsFormatType::Archive(d)) = lib.format_type {
            self.write_record(&GdsRecord::Format(d))?;
        }
        self.write_record(&GdsRecord::Units(lib.units.0, lib.units.1))?;
        for strukt in lib.structs.iter() {
            self.write_struct(strukt)?;
        }
        self.write_record(&GdsRecord::EndLib)?;
        self.dest.flush()?;
        Ok(())
    }
    /// Write one struct, BGNSTR through ENDSTR
    pub fn write_struct(&mut self, strukt: &GdsStruct) -> GdsResult<()> {
        self.write_record(&GdsRecord::BgnStruct {
            dates: strukt.dates.encode(),
        })?;
        self.write_record(&GdsRecord::StructName(strukt.name.to_string()))?;
        for elem in strukt.elems.iter() {
            for record in elem.to_records().iter() {
                self.write_record(record)?;
            }
        }
        self.write_record(&GdsRecord::EndStruct)
    }
    /// Encode `record` into bytes and write it onto `dest`
    pub fn write_record(&mut self, record: &GdsRecord) -> GdsResult<()> {
        // Strings are padded to even lengths
        let gds_strlen = |s: &str| -> usize { s.len() + s.len() % 2 };
        use GdsDataType::{BitArray, NoData, Str, F64, I16, I32};
        use GdsRecordType as R;
        let (rtype, dtype, len) = match record {
            // Library-Level Records
            GdsRecord::Header { .. } => (R::Header, I16, 2),
            GdsRecord::BgnLib { .. } => (R::BgnLib, I16, 24),
            GdsRecord::LibName(s) => (R::LibName, Str, gds_strlen(s)),
            GdsRecord::Units(_, _) => (R::Units, F64, 16),
            GdsRecord::EndLib => (R::EndLib, NoData, 0),

            // Structure (Cell) Level Records
            GdsRecord::BgnStruct { .. } => (R::BgnStruct, I16, 24),
            GdsRecord::StructName(s) => (R::StructName, Str, gds_strlen(s)),
            GdsRecord::StructRefName(s) => (R::StructRefName, Str, gds_strlen(s)),
            GdsRecord::EndStruct => (R::EndStruct, NoData, 0),

            // Element-Level Records
            GdsRecord::Boundary => (R::Boundary, NoData, 0),
            GdsRecord::Path => (R::Path, NoData, 0),
            GdsRecord::StructRef => (R::StructRef, NoData, 0),
            GdsRecord::ArrayRef => (R::ArrayRef, NoData, 0),
            GdsRecord::Text => (R::Text, NoData, 0),
            GdsRecord::Layer(_) => (R::Layer, I16, 2),
            GdsRecord::DataType(_) => (R::DataType, I16, 2),
            GdsRecord::Width(_) => (R::Width, I32, 4),
            GdsRecord::Xy(d) => (R::Xy, I32, 4 * d.len()),
            GdsRecord::EndElement => (R::EndElement, NoData, 0),

            // Less well-categorized record-types
            GdsRecord::ColRow { .. } => (R::ColRow, I16, 4),
            GdsRecord::Node => (R::Node, NoData, 0),
            GdsRecord::TextType(_) => (R::TextType, I16, 2),
            GdsRecord::Presentation(_, _) => (R::Presentation, BitArray, 2),
            GdsRecord::String(s) => (R::String, Str, gds_strlen(s)),
            GdsRecord::Strans(_, _) => (R::Strans, BitArray, 2),
            GdsRecord::Mag(_) => (R::Mag, F64, 8),
            GdsRecord::Angle(_) => (R::Angle, F64, 8),
            GdsRecord::RefLibs(s) => (R::RefLibs, Str, gds_strlen(s)),
            GdsRecord::Fonts(s) => (R::Fonts, Str, gds_strlen(s)),
            GdsRecord::PathType(_) => (R::PathType, I16, 2),
            GdsRecord::Generations(_) => (R::Generations, I16, 2),
            GdsRecord::AttrTable(s) => (R::AttrTable, Str, gds_strlen(s)),
            GdsRecord::ElemFlags(_, _) => (R::ElemFlags, BitArray, 2),
            GdsRecord::Nodetype(_) => (R::Nodetype, I16, 2),
            GdsRecord::PropAttr(_) => (R::PropAttr, I16, 2),
            GdsRecord::PropValue(s) => (R::PropValue, Str, gds_strlen(s)),
            GdsRecord::Box => (R::Box, NoData, 0),
            GdsRecord::BoxType(_) => (R::BoxType, I16, 2),
            GdsRecord::Plex(_) => (R::Plex, I32, 4),
            GdsRecord::BeginExtn(_) => (R::BeginExtn, I32, 4),
            GdsRecord::EndExtn(_) => (R::EndExtn, I32, 4),
            GdsRecord::TapeNum(_) => (R::TapeNum, I16, 2),
            GdsRecord::TapeCode(_) => (R::TapeCode, I16, 12),
            GdsRecord::Format(_) => (R::Format, I16, 2),
            GdsRecord::Mask(s) => (R::Mask, Str, gds_strlen(s)),
            GdsRecord::EndMasks => (R::EndMasks, NoData, 0),
            GdsRecord::LibDirSize(_) => (R::LibDirSize, I16, 2),
            GdsRecord::SrfName(s) => (R::SrfName, Str, gds_strlen(s)),
            GdsRecord::LibSecur(_) => (R::LibSecur, I16, 2),
        };
        // The length field counts the four header bytes
        let total = u16::try_from(len + 4).map_err(|_| GdsError::RecordLen(len))?;
        self.dest.write_u16::<BigEndian>(total)?;
        self.dest.write_u8(rtype as u8)?;
        self.dest.write_u8(dtype as u8)?;

        // Data content, organized by data-type
        match record {
            GdsRecord::EndLib
            | GdsRecord::EndStruct
            | GdsRecord::Boundary
            | GdsRecord::Path
            | GdsRecord::StructRef
            | GdsRecord::ArrayRef
            | GdsRecord::Text
            | GdsRecord::EndElement
            | GdsRecord::Node
            | GdsRecord::Box
            | GdsRecord::EndMasks => (),

            // Bit-arrays
            GdsRecord::Presentation(d0, d1)
            | GdsRecord::Strans(d0, d1)
            | GdsRecord::ElemFlags(d0, d1) => {
                self.dest.write_u8(*d0)?;
                self.dest.write_u8(*d1)?;
            }
            // Single i16s
            GdsRecord::Header { version: d }
            | GdsRecord::Layer(d)
            | GdsRecord::DataType(d)
            | GdsRecord::TextType(d)
            | GdsRecord::PathType(d)
            | GdsRecord::Generations(d)
            | GdsRecord::Nodetype(d)
            | GdsRecord::PropAttr(d)
            | GdsRecord::BoxType(d)
            | GdsRecord::TapeNum(d)
            | GdsRecord::Format(d)
            | GdsRecord::LibDirSize(d)
            | GdsRecord::LibSecur(d) => self.dest.write_i16::<BigEndian>(*d)?,

            // Single i32s
            GdsRecord::Width(d)
            | GdsRecord::Plex(d)
            | GdsRecord::BeginExtn(d)
            | GdsRecord::EndExtn(d) => self.dest.write_i32::<BigEndian>(*d)?,

            // Floats
            GdsRecord::Mag(d) | GdsRecord::Angle(d) => {
                self.dest.write_u64::<BigEndian>(GdsFloat64::encode(*d))?
            }
            GdsRecord::Units(d0, d1) => {
                self.dest.write_u64::<BigEndian>(GdsFloat64::encode(*d0))?;
                self.dest.write_u64::<BigEndian>(GdsFloat64::encode(*d1))?;
            }
            GdsRecord::ColRow { cols, rows } => {
                self.dest.write_i16::<BigEndian>(*cols)?;
                self.dest.write_i16::<BigEndian>(*rows)?;
            }
            // Arrays
            GdsRecord::BgnLib { dates: d } | GdsRecord::BgnStruct { dates: d } => {
                self.write_i16s(d)?
            }
            GdsRecord::TapeCode(d) => self.write_i16s(d)?,
            GdsRecord::Xy(d) => {
                for val in d.iter() {
                    self.dest.write_i32::<BigEndian>(*val)?;
                }
            }
            // Strings
            GdsRecord::LibName(s)
            | GdsRecord::StructName(s)
            | GdsRecord::StructRefName(s)
            | GdsRecord::String(s)
            | GdsRecord::RefLibs(s)
            | GdsRecord::Fonts(s)
            | GdsRecord::AttrTable(s)
            | GdsRecord::PropValue(s)
            | GdsRecord::Mask(s)
            | GdsRecord::SrfName(s) => {
                self.dest.write_all(s.as_bytes())?;
                if s.len() % 2 != 0 {
                    self.dest.write_u8(0x00)?;
                }
            }
        };
        Ok(())
    }
    fn write_i16s(&mut self, vals: &[i16]) -> GdsResult<()> {
        for val in vals.iter() {
            self.dest.write_i16::<BigEndian>(*val)?;
        }
        Ok(())
    }
    /// Unwrap the destination
    pub fn into_inner(self) -> W {
        self.dest
    }
}

/// # ToRecords
/// Flattening of an in-memory Gds object into the [GdsRecord] sequence which encodes it.
pub trait ToRecords {
    fn to_records(&self) -> Vec<GdsRecord>;
}

/// Append the optional ELFLAGS & PLEX records common to all elements
fn push_flags(records: &mut Vec<GdsRecord>, elflags: &Option<GdsElemFlags>, plex: &Option<GdsPlex>) {
    if let Some(ref e) = elflags {
        records.push(GdsRecord::ElemFlags(e.0, e.1));
    }
    if let Some(ref e) = plex {
        records.push(GdsRecord::Plex(e.0));
    }
}
/// Append properties and the closing ENDEL record
fn push_tail(records: &mut Vec<GdsRecord>, properties: &[GdsProperty]) {
    for prop in properties.iter() {
        records.push(GdsRecord::PropAttr(prop.attr));
        records.push(GdsRecord::PropValue(prop.value.clone()));
    }
    records.push(GdsRecord::EndElement);
}

impl ToRecords for GdsStrans {
    fn to_records(&self) -> Vec<GdsRecord> {
        let mut records = vec![GdsRecord::Strans(
            (self.reflected as u8) << 7,
            (self.abs_mag as u8) << 2 | (self.abs_angle as u8) << 1,
        )];
        if let Some(e) = self.mag {
            records.push(GdsRecord::Mag(e));
        }
        if let Some(e) = self.angle {
            records.push(GdsRecord::Angle(e));
        }
        records
    }
}

impl ToRecords for GdsPath {
    fn to_records(&self) -> Vec<GdsRecord> {
        let mut records = vec![GdsRecord::Path];
        push_flags(&mut records, &self.elflags, &self.plex);
        records.push(GdsRecord::Layer(self.layer));
        records.push(GdsRecord::DataType(self.datatype));
        if let Some(e) = self.path_type {
            records.push(GdsRecord::PathType(e));
        }
        if let Some(e) = self.width {
            records.push(GdsRecord::Width(e));
        }
        if let Some(e) = self.begin_extn {
            records.push(GdsRecord::BeginExtn(e));
        }
        if let Some(e) = self.end_extn {
            records.push(GdsRecord::EndExtn(e));
        }
        records.push(GdsRecord::Xy(GdsPoint::flatten_vec(&self.xy)));
        push_tail(&mut records, &self.properties);
        records
    }
}

impl ToRecords for GdsBoundary {
    fn to_records(&self) -> Vec<GdsRecord> {
        let mut records = vec![GdsRecord::Boundary];
        push_flags(&mut records, &self.elflags, &self.plex);
        records.push(GdsRecord::Layer(self.layer));
        records.push(GdsRecord::DataType(self.datatype));
        records.push(GdsRecord::Xy(GdsPoint::flatten_vec(&self.xy)));
        push_tail(&mut records, &self.properties);
        records
    }
}

impl ToRecords for GdsStructRef {
    fn to_records(&self) -> Vec<GdsRecord> {
        let mut records = vec![GdsRecord::StructRef];
        push_flags(&mut records, &self.elflags, &self.plex);
        records.push(GdsRecord::StructRefName(self.name.to_string()));
        if let Some(ref e) = self.strans {
            records.extend(e.to_records());
        }
        records.push(GdsRecord::Xy(self.xy.flatten()));
        push_tail(&mut records, &self.properties);
        records
    }
}

impl ToRecords for GdsArrayRef {
    fn to_records(&self) -> Vec<GdsRecord> {
        let mut records = vec![GdsRecord::ArrayRef];
        push_flags(&mut records, &self.elflags, &self.plex);
        records.push(GdsRecord::StructRefName(self.name.to_string()));
        if let Some(ref e) = self.strans {
            records.extend(e.to_records());
        }
        records.push(GdsRecord::ColRow {
            cols: self.cols,
            rows: self.rows,
        });
        records.push(GdsRecord::Xy(GdsPoint::flatten_vec(&self.xy)));
        push_tail(&mut records, &self.properties);
        records
    }
}

impl ToRecords for GdsTextElem {
    fn to_records(&self) -> Vec<GdsRecord> {
        let mut records = vec![GdsRecord::Text];
        push_flags(&mut records, &self.elflags, &self.plex);
        records.push(GdsRecord::Layer(self.layer));
        records.push(GdsRecord::TextType(self.texttype));
        if let Some(ref e) = self.presentation {
            records.push(GdsRecord::Presentation(e.0, e.1));
        }
        if let Some(e) = self.path_type {
            records.push(GdsRecord::PathType(e));
        }
        if let Some(e) = self.width {
            records.push(GdsRecord::Width(e));
        }
        if let Some(ref e) = self.strans {
            records.extend(e.to_records());
        }
        records.push(GdsRecord::Xy(self.xy.flatten()));
        records.push(GdsRecord::String(self.string.to_string()));
        push_tail(&mut records, &self.properties);
        records
    }
}

impl ToRecords for GdsNode {
    fn to_records(&self) -> Vec<GdsRecord> {
        let mut records = vec![GdsRecord::Node];
        push_flags(&mut records, &self.elflags, &self.plex);
        records.push(GdsRecord::Layer(self.layer));
        records.push(GdsRecord::Nodetype(self.nodetype));
        records.push(GdsRecord::Xy(GdsPoint::flatten_vec(&self.xy)));
        push_tail(&mut records, &self.properties);
        records
    }
}

impl ToRecords for GdsBox {
    fn to_records(&self) -> Vec<GdsRecord> {
        let mut records = vec![GdsRecord::Box];
        push_flags(&mut records, &self.elflags, &self.plex);
        records.push(GdsRecord::Layer(self.layer));
        records.push(GdsRecord::BoxType(self.boxtype));
        records.push(GdsRecord::Xy(GdsPoint::flatten_vec(&self.xy)));
        push_tail(&mut records, &self.properties);
        records
    }
}

impl ToRecords for GdsElement {
    fn to_records(&self) -> Vec<GdsRecord> {
        match self {
            GdsElement::GdsBoundary(e) => e.to_records(),
            GdsElement::GdsPath(e) => e.to_records(),
            GdsElement::GdsStructRef(e) => e.to_records(),
            GdsElement::GdsArrayRef(e) => e.to_records(),
            GdsElement::GdsTextElem(e) => e.to_records(),
            GdsElement::GdsNode(e) => e.to_records(),
            GdsElement::GdsBox(e) => e.to_records(),
        }
    }
}
