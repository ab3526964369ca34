//!
//! # Gds21 Data Model
//!

// Std-Lib Imports
use std::convert::TryFrom;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

// Crates.io
use arcstr::ArcStr;
use chrono::{Datelike, NaiveDate, NaiveDateTime, SubsecRound, Timelike, Utc};
use derive_builder::Builder;
use derive_more::{self, Add, AddAssign};
use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

// Local Imports
use crate::read::GdsParser;
use crate::ser::SerdeFile;
use crate::write::GdsWriter;

///
/// # Gds Record Types
///
/// Discriminants follow the numeric record ids, so [FromPrimitive] decodes them directly.
///
#[derive(FromPrimitive, Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum GdsRecordType {
    Header = 0x00,
    BgnLib,
    LibName,
    Units,
    EndLib,
    BgnStruct,
    StructName, // STRNAME
    EndStruct,
    Boundary,
    Path,
    StructRef,
    ArrayRef,
    Text,
    Layer,
    DataType,
    Width,
    Xy,
    EndElement,
    StructRefName, // SNAME
    ColRow,
    TextNode, // "Not currently used"
    Node,
    TextType,
    Presentation,
    Spacing, // "Discontinued"
    String,
    Strans,
    Mag,
    Angle,
    Uinteger, // "No longer used"
    Ustring,  // "No longer used"
    RefLibs,
    Fonts,
    PathType,
    Generations,
    AttrTable,
    StypTable, // "Unreleased Feature"
    StrType,   // "Unreleased Feature"
    ElemFlags,
    ElemKey,  // "Unreleased Feature"
    LinkType, // "Unreleased Feature"
    LinkKeys, // "Unreleased Feature"
    Nodetype,
    PropAttr,
    PropValue,
    Box,
    BoxType,
    Plex,
    BeginExtn, // "Only occurs in CustomPlus"
    EndExtn,   // "Only occurs in CustomPlus"
    TapeNum,
    TapeCode,
    StrClass, // "Only for Calma internal use"
    Reserved, // "Reserved for future use"
    Format,
    Mask,
    EndMasks,
    LibDirSize,
    SrfName,
    LibSecur,
}
impl GdsRecordType {
    /// Whether records of this type may appear in a stream.
    /// Deprecated and never-released ids are rejected.
    pub fn valid(&self) -> bool {
        !matches!(
            self,
            Self::TextNode
                | Self::Spacing
                | Self::Uinteger
                | Self::Ustring
                | Self::StypTable
                | Self::StrType
                | Self::ElemKey
                | Self::LinkType
                | Self::LinkKeys
                | Self::StrClass
                | Self::Reserved
        )
    }
}

/// # Gds DataType Enumeration
/// In order as decoded from the header's data-type byte
#[derive(FromPrimitive, Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum GdsDataType {
    NoData = 0,
    BitArray = 1,
    I16 = 2,
    I32 = 3,
    F32 = 4,
    F64 = 5,
    Str = 6,
}

/// # Gds Record Header
/// Decoded contents of a record's four header bytes.
/// `len` is the length of the record's content, *excluding* the header.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct GdsRecordHeader {
    pub rtype: GdsRecordType,
    pub dtype: GdsDataType,
    pub len: u16,
}

///
/// # Gds Record Enumeration
///
/// One decoded record. Payloads are typed but otherwise raw;
/// single-value arrays become scalars. No variants exist for invalid record ids.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GdsRecord {
    Header { version: i16 },
    BgnLib { dates: [i16; 12] },
    LibName(String),
    Units(f64, f64),
    EndLib,
    BgnStruct { dates: [i16; 12] },
    StructName(String),    // STRNAME Record
    StructRefName(String), // SNAME Record
    EndStruct,
    Boundary,
    Path,
    StructRef,
    ArrayRef,
    Text,
    Layer(i16),
    DataType(i16),
    Width(i32),
    Xy(Vec<i32>),
    EndElement,
    ColRow { cols: i16, rows: i16 },
    Node,
    TextType(i16),
    Presentation(u8, u8),
    String(String),
    Strans(u8, u8),
    Mag(f64),
    Angle(f64),
    RefLibs(String),
    Fonts(String),
    PathType(i16),
    Generations(i16),
    AttrTable(String),
    ElemFlags(u8, u8),
    Nodetype(i16),
    PropAttr(i16),
    PropValue(String),
    Box,
    BoxType(i16),
    Plex(i32),
    BeginExtn(i32),
    EndExtn(i32),
    TapeNum(i16),
    TapeCode([i16; 6]),
    Format(i16),
    Mask(String),
    EndMasks,
    LibDirSize(i16),
    SrfName(String),
    LibSecur(i16),
}

/// # Gds Floating Point
/// ## GDSII's Home-Grown Floating-Point Format
///
/// GDSII predates IEEE754, and brings its own eight-byte real:
/// a sign bit, a seven-bit excess-64 base-16 exponent, and a 56-bit mantissa in [1/16, 1).
///
/// [GdsFloat64] is not a data-store, only a namespace for conversions
/// to and from IEEE754 double-precision.
///
pub struct GdsFloat64;
impl GdsFloat64 {
    /// Decode GDSII's eight-byte representation, stored as a `u64`, to `f64`
    pub fn decode(val: u64) -> f64 {
        let neg = (val & 0x8000_0000_0000_0000) != 0;
        let exp: i32 = ((val & 0x7F00_0000_0000_0000) >> 56) as i32 - 64;
        let mantissa = (val & 0x00FF_FFFF_FFFF_FFFF) as f64 / 2f64.powi(56);
        let mag = mantissa * 16f64.powi(exp);
        if neg {
            -mag
        } else {
            mag
        }
    }
    /// Encode `f64` to GDSII's eight bytes, stored as `u64`.
    pub fn encode(mut val: f64) -> u64 {
        if val == 0.0 {
            return 0;
        };
        let mut top: u8 = 0;
        if val < 0.0 {
            top = 0x80;
            val = -val;
        }
        let fexp: f64 = 0.25 * val.log2();
        let mut exponent = fexp.ceil() as i32;
        if fexp == fexp.ceil() {
            exponent += 1;
        }
        let mut mantissa: u64 = (val * 16_f64.powi(14 - exponent)).round() as u64;
        if mantissa >= 1 << 56 {
            // Rounding carried into the next hex digit
            mantissa >>= 4;
            exponent += 1;
        }
        top += (64 + exponent) as u8;
        (top as u64).wrapping_shl(56) | (mantissa & 0x00FF_FFFF_FFFF_FFFF)
    }
}

/// # Gds Translation Settings
/// Placement transform of references and text, from `STRANS` and its trailing `MAG`/`ANGLE`.
#[derive(Default, Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GdsStrans {
    /// Mirror about the x-axis, applied before rotation.
    /// Applied before rotation.
    #[serde(default, skip_serializing_if = "is_false")]
    pub reflected: bool,
    /// Magnification ignores any parent transform
    #[serde(default, skip_serializing_if = "is_false")]
    pub abs_mag: bool,
    /// Absolute Angle Setting
    #[serde(default, skip_serializing_if = "is_false")]
    pub abs_angle: bool,
    /// Scale factor. Absent means 1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag: Option<f64>,
    /// Counter-clockwise rotation in degrees. Absent means zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

/// # Gds Text-Presentation Flags
/// Fonts, text justification, and the like, in raw `u8` form.
#[derive(Default, Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GdsPresentation(pub u8, pub u8);

/// # Gds Element Flags
/// Two bytes of `ELFLAGS` bit-fields, in raw `u8` form.
#[derive(Default, Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GdsElemFlags(pub u8, pub u8);

/// # Gds Plex
/// Plex id shared by every element of one plex group.
#[derive(Default, Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GdsPlex(pub i32);

/// # Gds Library Units
///
/// A library's two length units: the database unit and the user unit.
/// Coordinates are integer multiples of the database unit.
///
/// Field 0 is one database unit expressed in user units.
/// Field 1 is one database unit expressed in meters.
///
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct GdsUnits(pub f64, pub f64);
impl GdsUnits {
    /// Create a new [GdsUnits]
    pub fn new(num1: f64, num2: f64) -> Self {
        Self(num1, num2)
    }
    /// Database unit in meters. Every coordinate is a multiple of it.
    pub fn db_unit(&self) -> f64 {
        self.1
    }
    /// User unit in meters. Informational only.
    pub fn user_unit(&self) -> f64 {
        self.1 / self.0
    }
}
impl Default for GdsUnits {
    /// 1nm database units, 1µm user units
    fn default() -> Self {
        Self(1e-3, 1e-9)
    }
}

/// # Gds Spatial Point
/// An (x, y) location, in database units.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct GdsPoint {
    pub x: i32,
    pub y: i32,
}
impl GdsPoint {
    /// Create a new [GdsPoint]
    pub fn new(x: i32, y: i32) -> Self {
        GdsPoint { x, y }
    }
    /// Points from `(x, y)` tuples
    pub fn vec(pts: &[(i32, i32)]) -> Vec<Self> {
        pts.iter().map(|pt| Self::new(pt.0, pt.1)).collect()
    }
    /// Convert from a two-element slice
    pub(crate) fn parse(from: &[i32]) -> GdsResult<Self> {
        match from {
            [x, y] => Ok(GdsPoint::new(*x, *y)),
            _ => Err(GdsError::Str(
                "GdsPoint coordinate vector: Invalid number of elements".into(),
            )),
        }
    }
    /// Convert an n-element slice of `i32` into an n/2-element vector of [GdsPoint]s.
    pub fn parse_vec(from: &[i32]) -> GdsResult<Vec<GdsPoint>> {
        if from.len() % 2 != 0 {
            return Err(GdsError::Str(
                "GdsPoint coordinate vector: Invalid number of elements".into(),
            ));
        }
        Ok(from
            .chunks_exact(2)
            .map(|c| GdsPoint::new(c[0], c[1]))
            .collect())
    }
    /// As `[x, y]`
    pub(crate) fn flatten(&self) -> Vec<i32> {
        vec![self.x, self.y]
    }
    /// Convert a slice of [GdsPoint]s to a flat `i32` vector.
    pub(crate) fn flatten_vec(src: &[GdsPoint]) -> Vec<i32> {
        src.iter().flat_map(|p| [p.x, p.y]).collect()
    }
}

/// # Gds Mask-Format Enumeration
/// As set by the FORMAT record. Only the archive format is supported.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub enum GdsFormatType {
    Archive(i16),
}

/// # Gds Property
/// GDSII BNF:
/// ```text
/// PROPATTR PROPVALUE
/// ```
#[derive(Default, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GdsProperty {
    /// Attribute Number
    pub attr: i16,
    /// Attribute Value
    pub value: String,
}

///
/// # Gds Path Element
///
/// GDSII BNF:
/// ```text
/// PATH [ELFLAGS] [PLEX] LAYER DATATYPE [PATHTYPE] [WIDTH] [BGNEXTN] [ENDEXTN] XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsPath {
    // Required Fields
    /// Layer Number
    pub layer: i16,
    /// DataType ID
    pub datatype: i16,
    /// Vector of x,y coordinates
    pub xy: Vec<GdsPoint>,

    // Optional Fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub path_type: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub begin_extn: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub end_extn: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Boundary Element
///
/// A closed polygon. The last point repeats the first,
/// so an N-gon carries N+1 points.
///
/// GDSII BNF:
/// ```text
/// BOUNDARY [ELFLAGS] [PLEX] LAYER DATATYPE XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsBoundary {
    // Required Fields
    /// Layer Number
    pub layer: i16,
    /// DataType ID
    pub datatype: i16,
    /// Vector of x,y coordinates
    pub xy: Vec<GdsPoint>,

    // Optional Fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}
impl GdsBoundary {
    /// Create a closed, axis-aligned rectangle from corners `(x0, y0)` and `(x1, y1)`.
    pub fn rect(layer: i16, datatype: i16, (x0, y0): (i32, i32), (x1, y1): (i32, i32)) -> Self {
        Self {
            layer,
            datatype,
            xy: GdsPoint::vec(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            ..Default::default()
        }
    }
}

///
/// # Gds Struct Reference (Cell Instance)
///
/// One placement of another struct, by name, at origin `xy`.
///
/// GDSII BNF:
/// ```text
/// SREF [ELFLAGS] [PLEX] SNAME [<strans>] XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsStructRef {
    // Required Fields
    /// Struct (Cell) Name
    pub name: ArcStr,
    /// Location x,y coordinates
    pub xy: GdsPoint,

    // Optional Fields
    /// Translation & Reflection Options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub strans: Option<GdsStrans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Array Reference
///
/// A two-dimensional array of struct (cell) instances.
/// The three `xy` points are the origin, the column-displacement corner,
/// and the row-displacement corner.
///
/// GDSII BNF:
/// ```text
/// AREF [ELFLAGS] [PLEX] SNAME [<strans>] COLROW XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsArrayRef {
    // Required Fields
    /// Struct (Cell) Name
    pub name: ArcStr,
    /// Vector of x,y coordinates
    pub xy: [GdsPoint; 3],
    /// Number of columns
    pub cols: i16,
    /// Number of rows
    pub rows: i16,

    // Optional Fields
    /// Translation & Reflection Options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub strans: Option<GdsStrans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Text Element
///
/// GDSII BNF:
/// ```text
/// TEXT [ELFLAGS] [PLEX] LAYER
/// TEXTTYPE [PRESENTATION] [PATHTYPE] [WIDTH] [<strans>] XY STRING
/// ```
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsTextElem {
    // Required Fields
    /// Text Value
    pub string: ArcStr,
    /// Layer Number
    pub layer: i16,
    /// Text-Type ID
    pub texttype: i16,
    /// Vector of x,y coordinates
    pub xy: GdsPoint,

    // Optional Fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub presentation: Option<GdsPresentation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub path_type: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub width: Option<i32>,
    /// Translation & Reflection Options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub strans: Option<GdsStrans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Node Element
///
/// GDSII BNF:
/// ```text
/// NODE [ELFLAGS] [PLEX] LAYER NODETYPE XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsNode {
    // Required Fields
    /// Layer Number
    pub layer: i16,
    /// Node-Type ID
    pub nodetype: i16,
    /// Vector of x,y coordinates
    pub xy: Vec<GdsPoint>,

    // Optional Fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Box Element
///
/// GDSII BNF:
/// ```text
/// BOX [ELFLAGS] [PLEX] LAYER BOXTYPE XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsBox {
    // Required Fields
    /// Layer Number
    pub layer: i16,
    /// Box-Type ID
    pub boxtype: i16,
    /// Vector of x,y coordinates
    pub xy: [GdsPoint; 5],

    // Optional Fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Element Enumeration
///
/// Anything a struct can contain: shapes, labels, and instances of other structs.
///
/// GDSII BNF:
/// ```text
/// {<boundary> | <path> | <SREF> | <AREF> | <text> | <node> | <box>} {<property>}* ENDEL
/// ```
///
/// Each variant carries its own `properties`.
///
#[derive(derive_more::From, Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum GdsElement {
    GdsBoundary(GdsBoundary),
    GdsPath(GdsPath),
    GdsStructRef(GdsStructRef),
    GdsArrayRef(GdsArrayRef),
    GdsTextElem(GdsTextElem),
    GdsNode(GdsNode),
    GdsBox(GdsBox),
}
impl GdsElement {
    /// Name of the struct instantiated by this element, if it is a reference or array.
    pub fn struct_ref_name(&self) -> Option<&ArcStr> {
        match self {
            GdsElement::GdsStructRef(x) => Some(&x.name),
            GdsElement::GdsArrayRef(x) => Some(&x.name),
            _ => None,
        }
    }
    /// Mutable access to the instantiated struct name, for renaming references.
    pub fn struct_ref_name_mut(&mut self) -> Option<&mut ArcStr> {
        match self {
            GdsElement::GdsStructRef(x) => Some(&mut x.name),
            GdsElement::GdsArrayRef(x) => Some(&mut x.name),
            _ => None,
        }
    }
}

/// # Gds Summary Stats
///
/// Element counts by kind, for a [GdsLibrary] or [GdsStruct].
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    Add,
    AddAssign,
)]
pub struct GdsStats {
    pub libraries: usize,
    pub structs: usize,
    pub boundaries: usize,
    pub paths: usize,
    pub struct_refs: usize,
    pub array_refs: usize,
    pub text_elems: usize,
    pub nodes: usize,
    pub boxes: usize,
}

/// # Gds Date & Time
///
/// From the GDSII stream format manual:
/// ```text
/// Two-Byte Signed Integer
/// Contains last modification time of library (two bytes
/// each for year, month, day, hour, minute, and second)
/// as well as time of last access (same format) and
/// marks beginning of library.
/// ```
///
/// Years are referenced to 1900.
///
/// Values read from GDSII are stored as-is; nothing checks for real dates & times.
/// Plenty of tools in the wild write zeroes here.
/// Conversion to [NaiveDateTime] is fallible accordingly.
///
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GdsDateTime {
    pub year: i16,
    pub month: i16,
    pub day: i16,
    pub hour: i16,
    pub minute: i16,
    pub second: i16,
}
impl GdsDateTime {
    /// The current UTC time, to the second
    pub fn now() -> Self {
        Utc::now().naive_utc().round_subsecs(0).into()
    }
    /// Create from six `i16`s, in GDSII order
    pub fn from_slice(d: &[i16]) -> GdsResult<Self> {
        match d {
            [year, month, day, hour, minute, second] => Ok(Self {
                year: *year,
                month: *month,
                day: *day,
                hour: *hour,
                minute: *minute,
                second: *second,
            }),
            _ => Err(GdsError::Str("Invalid length GdsDateTime".into())),
        }
    }
    /// Encode in GDSII's six-`i16` order
    pub fn encode(&self) -> [i16; 6] {
        [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        ]
    }
}
impl Default for GdsDateTime {
    fn default() -> Self {
        Self::now()
    }
}
impl From<NaiveDateTime> for GdsDateTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: (dt.year() - 1900) as i16,
            month: dt.month() as i16,
            day: dt.day() as i16,
            hour: dt.hour() as i16,
            minute: dt.minute() as i16,
            second: dt.second() as i16,
        }
    }
}
impl TryFrom<GdsDateTime> for NaiveDateTime {
    type Error = GdsError;

    /// Fails on out-of-range fields, such as all-zero dates.
    fn try_from(dt: GdsDateTime) -> GdsResult<NaiveDateTime> {
        let ymd = NaiveDate::from_ymd_opt(
            i32::from(dt.year) + 1900,
            dt.month as u32,
            dt.day as u32,
        )
        .ok_or_else(|| GdsError::Str(format!("Invalid Date: {dt:?}")))?;
        ymd.and_hms_opt(dt.hour as u32, dt.minute as u32, dt.second as u32)
            .ok_or_else(|| GdsError::Str(format!("Invalid Time: {dt:?}")))
    }
}

/// # Gds Modification & Access Dates & Times
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GdsDateTimes {
    /// Last modified
    pub modified: GdsDateTime,
    /// Last Access Date & Time
    pub accessed: GdsDateTime,
}
impl GdsDateTimes {
    /// Parse from GDSII's twelve-`i16` format
    pub fn parse(d: &[i16]) -> GdsResult<Self> {
        if d.len() != 12 {
            return Err(GdsError::Str("Invalid length GdsDateTimes".into()));
        }
        Ok(Self {
            modified: GdsDateTime::from_slice(&d[0..6])?,
            accessed: GdsDateTime::from_slice(&d[6..12])?,
        })
    }
    /// Encode in GDSII's twelve-`i16` format
    pub fn encode(&self) -> [i16; 12] {
        let mut rv = [0; 12];
        rv[0..6].copy_from_slice(&self.modified.encode());
        rv[6..12].copy_from_slice(&self.accessed.encode());
        rv
    }
}
impl Default for GdsDateTimes {
    /// Makes a *single* call to `Utc::now()`, so the two dates will be the same.
    fn default() -> Self {
        let now = GdsDateTime::now();
        Self {
            modified: now,
            accessed: now,
        }
    }
}

///
/// # Gds Struct (Cell) Definition
///
/// A GDSII struct, i.e. a cell definition.
///
/// [GdsStruct]s are an un-indexed vector of [GdsElement]s.
/// Instances of other structs refer to them by name.
///
/// GDSII BNF:
/// ```text
/// BGNSTR STRNAME [STRCLASS] {<element>}* ENDSTR
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsStruct {
    /// Struct Name
    pub name: ArcStr,
    /// Modification & Access Dates & Times
    pub dates: GdsDateTimes,
    /// Elements List
    pub elems: Vec<GdsElement>,
}
impl GdsStruct {
    /// An empty struct named `name`, dated now
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    /// Element counts of this struct
    pub fn stats(&self) -> GdsStats {
        let mut stats = GdsStats {
            structs: 1,
            ..Default::default()
        };
        for elem in &self.elems {
            use GdsElement::*;
            match elem {
                GdsBoundary(_) => stats.boundaries += 1,
                GdsPath(_) => stats.paths += 1,
                GdsStructRef(_) => stats.struct_refs += 1,
                GdsArrayRef(_) => stats.array_refs += 1,
                GdsTextElem(_) => stats.text_elems += 1,
                GdsNode(_) => stats.nodes += 1,
                GdsBox(_) => stats.boxes += 1,
            };
        }
        stats
    }
    /// Iterate over the names of all structs instantiated here, including repeats
    pub fn struct_ref_names(&self) -> impl Iterator<Item = &ArcStr> + '_ {
        self.elems.iter().filter_map(GdsElement::struct_ref_name)
    }
}

///
/// # Gds Library
///
/// The contents of one GDSII stream: header fields, units, and struct definitions in file order.
///
/// Less common library-level records are kept as optional fields, and written back as read.
///
/// GDSII BNF:
/// ```text
/// HEADER BGNLIB [LIBDIRSIZE] [SRFNAME] [LIBSECUR] LIBNAME [REFLIBS] [FONTS] [ATTRTABLE] [GENERATIONS] [<FormatType>]
/// UNITS {<structure>}* ENDLIB
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsLibrary {
    // Required fields
    /// Library Name
    pub name: ArcStr,
    /// GDSII stream version
    pub version: i16,
    /// Modification & Access Dates & Times
    pub dates: GdsDateTimes,
    /// Spatial Units
    pub units: GdsUnits,
    /// Struct Definitions
    pub structs: Vec<GdsStruct>,

    // Optional fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub libdirsize: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub srfname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub reflibs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub fonts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub attrtable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub generations: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub format_type: Option<GdsFormatType>,
}
impl GdsLibrary {
    /// An empty library named `name`, dated now
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            version: 3,
            ..Default::default()
        }
    }
    /// Read the GDSII file at `fname`
    pub fn open(fname: impl AsRef<Path>) -> GdsResult<GdsLibrary> {
        GdsParser::open(fname)?.parse_lib()
    }
    /// Alias for [`GdsLibrary::open`].
    pub fn load(fname: impl AsRef<Path>) -> GdsResult<GdsLibrary> {
        GdsLibrary::open(fname)
    }
    /// Decode an in-memory GDSII stream
    pub fn from_bytes(bytes: &[u8]) -> GdsResult<GdsLibrary> {
        GdsParser::new(bytes)?.parse_lib()
    }
    /// Read a [GdsLibrary] from any [Read] source
    pub fn read(src: impl Read) -> GdsResult<GdsLibrary> {
        GdsParser::new(BufReader::new(src))?.parse_lib()
    }
    /// Struct and element counts across the library
    pub fn stats(&self) -> GdsStats {
        let mut stats = GdsStats {
            libraries: 1,
            ..Default::default()
        };
        for strukt in self.structs.iter() {
            stats += strukt.stats();
        }
        stats
    }
    /// Save to file `fname`
    pub fn save(&self, fname: impl AsRef<Path>) -> GdsResult<()> {
        let file = BufWriter::new(File::create(fname)?);
        self.write(file)
    }
    /// Write to destination `file`
    pub fn write(&self, file: impl Write) -> GdsResult<()> {
        let mut wr = GdsWriter::new(file);
        wr.write_lib(self)
    }
    /// Get a reference to the struct named `name`, if present.
    /// Linear in the number of structs.
    pub fn find_struct(&self, name: &str) -> Option<&GdsStruct> {
        self.structs.iter().find(|s| s.name == name)
    }
    /// Get a mutable reference to the struct named `name`, if present.
    pub fn find_struct_mut(&mut self, name: &str) -> Option<&mut GdsStruct> {
        self.structs.iter_mut().find(|s| s.name == name)
    }
}
// Enable [GdsLibrary] and [GdsStruct] serialization to file, in each of `ser`'s supported formats.
impl SerdeFile for GdsLibrary {}
impl SerdeFile for GdsStruct {}

/// # Gds Context
/// Where in the stream hierarchy the parser was, for error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GdsContext {
    Library,
    Struct,
    StructRef,
    ArrayRef,
    Boundary,
    Box,
    Path,
    Text,
    Node,
    Property,
}

/// # GdsResult Type-Alias
pub type GdsResult<T> = Result<T, GdsError>;

/// # Gds Error Enumeration
/// Errors from decoding or encoding GDSII streams.
#[derive(Debug)]
pub enum GdsError {
    /// Payload length does not fit the record and data type
    RecordDecode(GdsRecordType, GdsDataType, u16),
    /// Invalid record length
    RecordLen(usize),
    /// Invalid data type
    InvalidDataType(u8),
    /// Invalid record type
    InvalidRecordType(u8),
    /// Valid GDSII this crate does not handle
    Unsupported(Option<GdsRecord>, Option<GdsContext>),
    /// Parser Errors
    Parse {
        msg: String,
        record: GdsRecord,
        recordnum: usize,
        bytepos: u64,
        ctx: Vec<GdsContext>,
    },
    /// Boxed (External) Errors
    Boxed(Box<dyn Error + Send + Sync>),
    /// Other errors
    Str(String),
}
impl std::fmt::Display for GdsError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            GdsError::Parse {
                msg,
                record,
                recordnum,
                bytepos,
                ctx,
            } => write!(
                f,
                "{msg}: record #{recordnum} {record:?} at byte {bytepos} (context {ctx:?})"
            ),
            GdsError::Boxed(e) => write!(f, "{e}"),
            GdsError::Str(s) => write!(f, "{s}"),
            // Everything else delegates to the derived [std::fmt::Debug]
            _ => write!(f, "{:?}", self),
        }
    }
}
impl Error for GdsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GdsError::Boxed(e) => Some(&**e),
            _ => None,
        }
    }
}
impl From<std::io::Error> for GdsError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<std::str::Utf8Error> for GdsError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<String> for GdsError {
    fn from(e: String) -> Self {
        GdsError::Str(e)
    }
}
impl From<&str> for GdsError {
    fn from(e: &str) -> Self {
        GdsError::Str(e.to_string())
    }
}
impl From<crate::ser::Error> for GdsError {
    fn from(e: crate::ser::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}

/// Our helper for "do not serialize default `false` boolean values".
/// A function because that is what `#[serde(skip_serializing_if)]` accepts.
fn is_false(b: &bool) -> bool {
    !b
}

#[cfg(any(test, feature = "selftest"))]
/// Write `lib` to a temporary file, read it back, and compare
pub fn roundtrip(lib: &GdsLibrary) -> GdsResult<()> {
    use std::io::{Seek, SeekFrom};
    use tempfile::tempfile;

    // Write to a temporary file
    let mut file = tempfile()?;
    lib.write(&mut file)?;

    // Rewind to the file-start, and read it back
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let lib2 = GdsLibrary::from_bytes(&bytes)?;

    // And check the two line up
    assert_eq!(*lib, lib2);
    Ok(())
}
