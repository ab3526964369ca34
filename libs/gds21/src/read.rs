//!
//! # Gds21 Reading
//!

// Std-Lib Imports
use std::convert::TryInto;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::mem;
use std::path::Path;

// Crates.io
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use num_traits::FromPrimitive;

// Local Imports
use crate::data::*;

/// # GdsReader
/// Decodes binary GDSII records from any [Read] source,
/// tracking the byte-position along the way for error reporting.
pub struct GdsReader<R: Read> {
    /// Source being read
    src: R,
    /// Bytes consumed so far
    pos: u64,
}
impl GdsReader<BufReader<File>> {
    /// Open `fname` for buffered reading
    pub fn open(fname: impl AsRef<Path>) -> GdsResult<Self> {
        Ok(Self::new(BufReader::new(File::open(fname)?)))
    }
}
impl<R: Read> GdsReader<R> {
    /// Create a [GdsReader] of `src`
    pub fn new(src: R) -> Self {
        Self { src, pos: 0 }
    }
    /// Get the current byte position
    pub fn pos(&self) -> u64 {
        self.pos
    }
    /// Fill `buf` from the source, converting a truncated stream into a descriptive error
    fn fill(&mut self, buf: &mut [u8]) -> GdsResult<()> {
        match self.src.read_exact(buf) {
            Ok(()) => {
                self.pos += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(GdsError::Str(format!(
                "Unexpected end of GDS stream at byte {}, before ENDLIB",
                self.pos
            ))),
            Err(e) => Err(e.into()),
        }
    }
    /// Read the next record-header.
    /// Validates lengths, record types and data types.
    pub fn read_record_header(&mut self) -> GdsResult<GdsRecordHeader> {
        let mut bytes = [0u8; 4];
        self.fill(&mut bytes)?;
        // The 16-bit record-size, in bytes, includes the four header bytes.
        let len = match BigEndian::read_u16(&bytes[0..2]) {
            num if num < 4 => return Err(GdsError::RecordLen(num.into())),
            num if num % 2 != 0 => return Err(GdsError::RecordLen(num.into())),
            num => num - 4,
        };
        let rtype: GdsRecordType =
            FromPrimitive::from_u8(bytes[2]).ok_or(GdsError::InvalidRecordType(bytes[2]))?;
        if !rtype.valid() {
            return Err(GdsError::InvalidRecordType(bytes[2]));
        }
        let dtype: GdsDataType =
            FromPrimitive::from_u8(bytes[3]).ok_or(GdsError::InvalidDataType(bytes[3]))?;
        Ok(GdsRecordHeader { rtype, dtype, len })
    }
    /// Decode the next [GdsRecord].
    /// Fails if the source is not on a record-boundary, or if decoding otherwise fails.
    pub fn read_record(&mut self) -> GdsResult<GdsRecord> {
        let header = self.read_record_header()?;
        self.read_record_content(&header)
    }
    fn read_record_content(&mut self, header: &GdsRecordHeader) -> GdsResult<GdsRecord> {
        use GdsDataType::{BitArray, NoData, Str, F64, I16, I32};
        use GdsRecordType as R;
        let len = header.len;
        let record: GdsRecord = match (header.rtype, header.dtype, len) {
            // Library-Level Records
            (R::Header, I16, 2) => GdsRecord::Header {
                version: self.read_i16()?,
            },
            (R::BgnLib, I16, 24) => GdsRecord::BgnLib {
                dates: self.read_i16s::<12>()?,
            },
            (R::LibName, Str, _) => GdsRecord::LibName(self.read_str(len)?),
            (R::Units, F64, 16) => {
                let [user, db] = self.read_f64s::<2>()?;
                GdsRecord::Units(user, db)
            }
            (R::EndLib, NoData, 0) => GdsRecord::EndLib,

            // Structure (Cell) Level Records
            (R::BgnStruct, I16, 24) => GdsRecord::BgnStruct {
                dates: self.read_i16s::<12>()?,
            },
            (R::StructName, Str, _) => GdsRecord::StructName(self.read_str(len)?),
            (R::StructRefName, Str, _) => GdsRecord::StructRefName(self.read_str(len)?),
            (R::EndStruct, NoData, 0) => GdsRecord::EndStruct,

            // Element-Level Records
            (R::Boundary, NoData, 0) => GdsRecord::Boundary,
            (R::Path, NoData, 0) => GdsRecord::Path,
            (R::StructRef, NoData, 0) => GdsRecord::StructRef,
            (R::ArrayRef, NoData, 0) => GdsRecord::ArrayRef,
            (R::Text, NoData, 0) => GdsRecord::Text,
            (R::Layer, I16, 2) => GdsRecord::Layer(self.read_i16()?),
            (R::DataType, I16, 2) => GdsRecord::DataType(self.read_i16()?),
            (R::Width, I32, 4) => GdsRecord::Width(self.read_i32()?),
            (R::Xy, I32, n) if n % 4 == 0 => GdsRecord::Xy(self.read_i32_vec(n)?),
            (R::EndElement, NoData, 0) => GdsRecord::EndElement,

            // Less well-categorized record-types
            (R::ColRow, I16, 4) => {
                let [cols, rows] = self.read_i16s::<2>()?;
                GdsRecord::ColRow { cols, rows }
            }
            (R::Node, NoData, 0) => GdsRecord::Node,
            (R::TextType, I16, 2) => GdsRecord::TextType(self.read_i16()?),
            (R::Presentation, BitArray, 2) => {
                let [d0, d1] = self.read_bytes::<2>()?;
                GdsRecord::Presentation(d0, d1)
            }
            (R::String, Str, _) => GdsRecord::String(self.read_str(len)?),
            (R::Strans, BitArray, 2) => {
                let [d0, d1] = self.read_bytes::<2>()?;
                GdsRecord::Strans(d0, d1)
            }
            (R::Mag, F64, 8) => GdsRecord::Mag(self.read_f64s::<1>()?[0]),
            (R::Angle, F64, 8) => GdsRecord::Angle(self.read_f64s::<1>()?[0]),
            (R::RefLibs, Str, _) => GdsRecord::RefLibs(self.read_str(len)?),
            (R::Fonts, Str, _) => GdsRecord::Fonts(self.read_str(len)?),
            (R::PathType, I16, 2) => GdsRecord::PathType(self.read_i16()?),
            (R::Generations, I16, 2) => GdsRecord::Generations(self.read_i16()?),
            (R::AttrTable, Str, _) => GdsRecord::AttrTable(self.read_str(len)?),
            (R::ElemFlags, BitArray, 2) => {
                let [d0, d1] = self.read_bytes::<2>()?;
                GdsRecord::ElemFlags(d0, d1)
            }
            (R::Nodetype, I16, 2) => GdsRecord::Nodetype(self.read_i16()?),
            (R::PropAttr, I16, 2) => GdsRecord::PropAttr(self.read_i16()?),
            (R::PropValue, Str, _) => GdsRecord::PropValue(self.read_str(len)?),
            (R::Box, NoData, 0) => GdsRecord::Box,
            (R::BoxType, I16, 2) => GdsRecord::BoxType(self.read_i16()?),
            (R::Plex, I32, 4) => GdsRecord::Plex(self.read_i32()?),
            (R::BeginExtn, I32, 4) => GdsRecord::BeginExtn(self.read_i32()?),
            (R::EndExtn, I32, 4) => GdsRecord::EndExtn(self.read_i32()?),
            (R::TapeNum, I16, 2) => GdsRecord::TapeNum(self.read_i16()?),
            (R::TapeCode, I16, 12) => GdsRecord::TapeCode(self.read_i16s::<6>()?),
            (R::Format, I16, 2) => GdsRecord::Format(self.read_i16()?),
            (R::Mask, Str, _) => GdsRecord::Mask(self.read_str(len)?),
            (R::EndMasks, NoData, 0) => GdsRecord::EndMasks,
            (R::LibDirSize, I16, 2) => GdsRecord::LibDirSize(self.read_i16()?),
            (R::SrfName, Str, _) => GdsRecord::SrfName(self.read_str(len)?),
            (R::LibSecur, I16, 2) => GdsRecord::LibSecur(self.read_i16()?),

            // Anything unmatched is a malformed record
            _ => return Err(GdsError::RecordDecode(header.rtype, header.dtype, len)),
        };
        Ok(record)
    }
    /// Read `len` bytes and convert to `String`.
    /// A single trailing NUL pad byte, if present, is dropped.
    fn read_str(&mut self, len: u16) -> GdsResult<String> {
        let mut data = vec![0u8; len.into()];
        self.fill(&mut data)?;
        if data.last() == Some(&0x00) {
            data.pop();
        }
        Ok(std::str::from_utf8(&data)?.into())
    }
    /// Read exactly `N` bytes
    fn read_bytes<const N: usize>(&mut self) -> GdsResult<[u8; N]> {
        let mut rv = [0u8; N];
        self.fill(&mut rv)?;
        Ok(rv)
    }
    fn read_i16(&mut self) -> GdsResult<i16> {
        Ok(BigEndian::read_i16(&self.read_bytes::<2>()?))
    }
    fn read_i32(&mut self) -> GdsResult<i32> {
        Ok(BigEndian::read_i32(&self.read_bytes::<4>()?))
    }
    /// Read `N` i16s
    fn read_i16s<const N: usize>(&mut self) -> GdsResult<[i16; N]> {
        let mut rv = [0i16; N];
        for v in rv.iter_mut() {
            *v = self.read_i16()?;
        }
        Ok(rv)
    }
    /// `len` bytes as big-endian i32s
    fn read_i32_vec(&mut self, len: u16) -> GdsResult<Vec<i32>> {
        let mut bytes = vec![0u8; len.into()];
        self.fill(&mut bytes)?;
        let mut rv = vec![0i32; bytes.len() / 4];
        bytes.as_slice().read_i32_into::<BigEndian>(&mut rv)?;
        Ok(rv)
    }
    /// Read `N` f64s, decoding GDSII's float-format along the way
    fn read_f64s<const N: usize>(&mut self) -> GdsResult<[f64; N]> {
        let mut rv = [0f64; N];
        for v in rv.iter_mut() {
            *v = GdsFloat64::decode(BigEndian::read_u64(&self.read_bytes::<8>()?));
        }
        Ok(rv)
    }
}

/// # GdsParser
/// A peekable iterator which loads [GdsRecord]s from a [GdsReader], one at a time,
/// and converts them into a tree of Gds data structures.
pub struct GdsParser<R: Read> {
    /// Record reader
    rdr: GdsReader<R>,
    /// Lookahead record
    nxt: GdsRecord,
    /// Number of records read
    numread: usize,
    /// Context Stack
    ctx_stack: Vec<GdsContext>,
}
impl GdsParser<BufReader<File>> {
    /// Create a new [GdsParser] for the file at path `fname`
    pub fn open(fname: impl AsRef<Path>) -> GdsResult<Self> {
        Self::from_reader(GdsReader::open(fname)?)
    }
}
impl<R: Read> GdsParser<R> {
    /// Create a new [GdsParser] reading from `src`
    pub fn new(src: R) -> GdsResult<Self> {
        Self::from_reader(GdsReader::new(src))
    }
    /// Create a new [GdsParser] from a [GdsReader]
    pub fn from_reader(mut rdr: GdsReader<R>) -> GdsResult<Self> {
        // Prime the lookahead
        let nxt = rdr.read_record()?;
        Ok(GdsParser {
            rdr,
            nxt,
            numread: 1,
            ctx_stack: Vec::new(),
        })
    }
    /// Consume and return the next record
    fn next(&mut self) -> GdsResult<GdsRecord> {
        if self.nxt == GdsRecord::EndLib {
            // ENDLIB is sticky
            return Ok(GdsRecord::EndLib);
        }
        // Decode one record ahead, hand back the current one
        let mut rv = self.rdr.read_record()?;
        mem::swap(&mut rv, &mut self.nxt);
        self.numread += 1;
        Ok(rv)
    }
    /// The next record, without consuming it
    fn peek(&self) -> &GdsRecord {
        &self.nxt
    }
    /// Parse a [GdsLibrary]. Generally the start-state when reading a GDS stream.
    pub fn parse_lib(&mut self) -> GdsResult<GdsLibrary> {
        self.ctx_stack.push(GdsContext::Library);
        let mut lib = GdsLibraryBuilder::default();
        let mut structs = Vec::<GdsStruct>::new();
        lib = match self.next()? {
            GdsRecord::Header { version } => lib.version(version),
            _ => return self.fail("Invalid library: missing GDS HEADER record"),
        };
        lib = match self.next()? {
            GdsRecord::BgnLib { dates } => lib.dates(GdsDateTimes::parse(&dates)?),
            _ => return self.fail("Invalid library: missing GDS BGNLIB record"),
        };
        loop {
            let r = self.next()?;
            lib = match r {
                GdsRecord::EndLib => break,
                GdsRecord::LibName(d) => lib.name(d),
                GdsRecord::Units(d0, d1) => lib.units(GdsUnits(d0, d1)),
                GdsRecord::BgnStruct { dates } => {
                    structs.push(self.parse_struct(&dates)?);
                    lib
                }
                // Optional library metadata, kept for writing back
                GdsRecord::LibDirSize(d) => lib.libdirsize(d),
                GdsRecord::SrfName(d) => lib.srfname(d),
                GdsRecord::RefLibs(d) => lib.reflibs(d),
                GdsRecord::Fonts(d) => lib.fonts(d),
                GdsRecord::AttrTable(d) => lib.attrtable(d),
                GdsRecord::Generations(d) => lib.generations(d),
                GdsRecord::Format(d) => lib.format_type(GdsFormatType::Archive(d)),
                // Valid GDSII, but filtered formats and access-control lists are not handled
                GdsRecord::Mask(_) | GdsRecord::EndMasks | GdsRecord::LibSecur(_) => {
                    return Err(GdsError::Unsupported(Some(r), Some(GdsContext::Library)))
                }
                _ => return self.invalid(r),
            };
        }
        lib = lib.structs(structs);
        let lib = lib.build()?;
        self.ctx_stack.pop();
        Ok(lib)
    }
    /// Parse a cell ([GdsStruct]).
    /// Requires its [GdsRecord::BgnStruct] record, and contained `dates`, have already been read.
    fn parse_struct(&mut self, dates: &[i16]) -> GdsResult<GdsStruct> {
        self.ctx_stack.push(GdsContext::Struct);
        let mut strukt = GdsStructBuilder::default().dates(GdsDateTimes::parse(dates)?);
        strukt = match self.next()? {
            GdsRecord::StructName(d) => strukt.name(d),
            _ => return self.fail("Missing Gds StructName"),
        };
        // Elements run until ENDSTR
        let mut elems = Vec::<GdsElement>::new();
        loop {
            let r = self.next()?;
            match r {
                GdsRecord::EndStruct => break,
                GdsRecord::Boundary => elems.push(self.parse_boundary()?.into()),
                GdsRecord::Text => elems.push(self.parse_text_elem()?.into()),
                GdsRecord::Path => elems.push(self.parse_path()?.into()),
                GdsRecord::Box => elems.push(self.parse_box()?.into()),
                GdsRecord::StructRef => elems.push(self.parse_struct_ref()?.into()),
                GdsRecord::ArrayRef => elems.push(self.parse_array_ref()?.into()),
                GdsRecord::Node => elems.push(self.parse_node()?.into()),
                _ => return self.invalid(r),
            };
        }
        let strukt = strukt.elems(elems).build()?;
        self.ctx_stack.pop();
        Ok(strukt)
    }
    /// Parse a [GdsBoundary]
    fn parse_boundary(&mut self) -> GdsResult<GdsBoundary> {
        self.ctx_stack.push(GdsContext::Boundary);
        let mut b = GdsBoundaryBuilder::default();
        let mut props: Vec<GdsProperty> = Vec::new();
        loop {
            let r = self.next()?;
            b = match r {
                GdsRecord::EndElement => break,
                GdsRecord::Layer(d) => b.layer(d),
                GdsRecord::DataType(d) => b.datatype(d),
                GdsRecord::Xy(d) => b.xy(GdsPoint::parse_vec(&d)?),
                GdsRecord::Plex(d) => b.plex(GdsPlex(d)),
                GdsRecord::ElemFlags(d0, d1) => b.elflags(GdsElemFlags(d0, d1)),
                GdsRecord::PropAttr(attr) => {
                    props.push(self.parse_property(attr)?);
                    b
                }
                _ => return self.invalid(r),
            };
        }
        let b = b.properties(props).build()?;
        self.ctx_stack.pop();
        Ok(b)
    }
    /// Parse a [GdsPath]
    fn parse_path(&mut self) -> GdsResult<GdsPath> {
        self.ctx_stack.push(GdsContext::Path);
        let mut b = GdsPathBuilder::default();
        let mut props: Vec<GdsProperty> = Vec::new();
        loop {
            let r = self.next()?;
            b = match r {
                GdsRecord::EndElement => break,
                GdsRecord::Layer(d) => b.layer(d),
                GdsRecord::DataType(d) => b.datatype(d),
                GdsRecord::Xy(d) => b.xy(GdsPoint::parse_vec(&d)?),
                GdsRecord::Width(d) => b.width(d),
                GdsRecord::PathType(d) => b.path_type(d),
                GdsRecord::BeginExtn(d) => b.begin_extn(d),
                GdsRecord::EndExtn(d) => b.end_extn(d),
                GdsRecord::Plex(d) => b.plex(GdsPlex(d)),
                GdsRecord::ElemFlags(d0, d1) => b.elflags(GdsElemFlags(d0, d1)),
                GdsRecord::PropAttr(attr) => {
                    props.push(self.parse_property(attr)?);
                    b
                }
                _ => return self.invalid(r),
            };
        }
        let b = b.properties(props).build()?;
        self.ctx_stack.pop();
        Ok(b)
    }
    /// Parse a [GdsTextElem].
    /// The opening `TEXT` record has already been consumed.
    fn parse_text_elem(&mut self) -> GdsResult<GdsTextElem> {
        self.ctx_stack.push(GdsContext::Text);
        let mut b = GdsTextElemBuilder::default();
        let mut props: Vec<GdsProperty> = Vec::new();
        loop {
            let r = self.next()?;
            b = match r {
                GdsRecord::EndElement => break,
                GdsRecord::Layer(d) => b.layer(d),
                GdsRecord::TextType(d) => b.texttype(d),
                GdsRecord::Xy(d) => b.xy(GdsPoint::parse(&d)?),
                GdsRecord::String(d) => b.string(d),
                GdsRecord::Presentation(d0, d1) => b.presentation(GdsPresentation(d0, d1)),
                GdsRecord::PathType(d) => b.path_type(d),
                GdsRecord::Width(d) => b.width(d),
                GdsRecord::Plex(d) => b.plex(GdsPlex(d)),
                GdsRecord::ElemFlags(d0, d1) => b.elflags(GdsElemFlags(d0, d1)),
                GdsRecord::Strans(d0, d1) => b.strans(self.parse_strans(d0, d1)?),
                GdsRecord::PropAttr(attr) => {
                    props.push(self.parse_property(attr)?);
                    b
                }
                _ => return self.invalid(r),
            };
        }
        let b = b.properties(props).build()?;
        self.ctx_stack.pop();
        Ok(b)
    }
    /// Parse a [GdsNode]
    fn parse_node(&mut self) -> GdsResult<GdsNode> {
        self.ctx_stack.push(GdsContext::Node);
        let mut b = GdsNodeBuilder::default();
        let mut props: Vec<GdsProperty> = Vec::new();
        loop {
            let r = self.next()?;
            b = match r {
                GdsRecord::EndElement => break,
                GdsRecord::Layer(d) => b.layer(d),
                GdsRecord::Nodetype(d) => b.nodetype(d),
                GdsRecord::Xy(d) => b.xy(GdsPoint::parse_vec(&d)?),
                GdsRecord::Plex(d) => b.plex(GdsPlex(d)),
                GdsRecord::ElemFlags(d0, d1) => b.elflags(GdsElemFlags(d0, d1)),
                GdsRecord::PropAttr(attr) => {
                    props.push(self.parse_property(attr)?);
                    b
                }
                _ => return self.invalid(r),
            };
        }
        let b = b.properties(props).build()?;
        self.ctx_stack.pop();
        Ok(b)
    }
    /// Parse a [GdsBox]
    fn parse_box(&mut self) -> GdsResult<GdsBox> {
        self.ctx_stack.push(GdsContext::Box);
        let mut b = GdsBoxBuilder::default();
        let mut props: Vec<GdsProperty> = Vec::new();
        loop {
            let r = self.next()?;
            b = match r {
                GdsRecord::EndElement => break,
                GdsRecord::Layer(d) => b.layer(d),
                GdsRecord::BoxType(d) => b.boxtype(d),
                GdsRecord::Xy(d) => {
                    // Box outlines are exactly five points
                    let xy: [GdsPoint; 5] = match GdsPoint::parse_vec(&d)?.try_into() {
                        Ok(xy) => xy,
                        Err(_) => return self.fail("Invalid XY for GdsBox"),
                    };
                    b.xy(xy)
                }
                GdsRecord::Plex(d) => b.plex(GdsPlex(d)),
                GdsRecord::ElemFlags(d0, d1) => b.elflags(GdsElemFlags(d0, d1)),
                GdsRecord::PropAttr(attr) => {
                    props.push(self.parse_property(attr)?);
                    b
                }
                _ => return self.invalid(r),
            };
        }
        let b = b.properties(props).build()?;
        self.ctx_stack.pop();
        Ok(b)
    }
    /// Parse a [GdsStructRef]
    fn parse_struct_ref(&mut self) -> GdsResult<GdsStructRef> {
        self.ctx_stack.push(GdsContext::StructRef);
        let mut b = GdsStructRefBuilder::default();
        let mut props: Vec<GdsProperty> = Vec::new();
        loop {
            let r = self.next()?;
            b = match r {
                GdsRecord::EndElement => break,
                GdsRecord::StructRefName(d) => b.name(d),
                GdsRecord::Xy(d) => b.xy(GdsPoint::parse(&d)?),
                GdsRecord::Plex(d) => b.plex(GdsPlex(d)),
                GdsRecord::ElemFlags(d0, d1) => b.elflags(GdsElemFlags(d0, d1)),
                GdsRecord::Strans(d0, d1) => b.strans(self.parse_strans(d0, d1)?),
                GdsRecord::PropAttr(attr) => {
                    props.push(self.parse_property(attr)?);
                    b
                }
                _ => return self.invalid(r),
            };
        }
        let b = b.properties(props).build()?;
        self.ctx_stack.pop();
        Ok(b)
    }
    /// Parse a [GdsArrayRef]
    fn parse_array_ref(&mut self) -> GdsResult<GdsArrayRef> {
        self.ctx_stack.push(GdsContext::ArrayRef);
        let mut b = GdsArrayRefBuilder::default();
        let mut props: Vec<GdsProperty> = Vec::new();
        loop {
            let r = self.next()?;
            b = match r {
                GdsRecord::EndElement => break,
                GdsRecord::StructRefName(d) => b.name(d),
                GdsRecord::ColRow { rows, cols } => b.rows(rows).cols(cols),
                GdsRecord::Xy(d) => {
                    // Origin, column-corner, and row-corner
                    let xy: [GdsPoint; 3] = match GdsPoint::parse_vec(&d)?.try_into() {
                        Ok(xy) => xy,
                        Err(_) => return self.fail("Invalid XY for GdsArrayRef"),
                    };
                    b.xy(xy)
                }
                GdsRecord::Plex(d) => b.plex(GdsPlex(d)),
                GdsRecord::ElemFlags(d0, d1) => b.elflags(GdsElemFlags(d0, d1)),
                GdsRecord::Strans(d0, d1) => b.strans(self.parse_strans(d0, d1)?),
                GdsRecord::PropAttr(attr) => {
                    props.push(self.parse_property(attr)?);
                    b
                }
                _ => return self.invalid(r),
            };
        }
        let b = b.properties(props).build()?;
        self.ctx_stack.pop();
        Ok(b)
    }
    /// Parse a [GdsStrans]. Its two flag bytes are passed as arguments `d0`, `d1`.
    fn parse_strans(&mut self, d0: u8, d1: u8) -> GdsResult<GdsStrans> {
        let mut s = GdsStrans {
            reflected: d0 & 0x80 != 0,
            abs_mag: d1 & 0x04 != 0,
            abs_angle: d1 & 0x02 != 0,
            ..Default::default()
        };
        // Optional magnification & angle follow directly
        loop {
            match self.peek() {
                GdsRecord::Mag(d) => {
                    s.mag = Some(*d);
                    self.next()?;
                }
                GdsRecord::Angle(d) => {
                    s.angle = Some(*d);
                    self.next()?;
                }
                _ => break,
            }
        }
        Ok(s)
    }
    /// Parse a [GdsProperty].
    /// Numeric attribute `attr` is collected beforehand,
    /// as its record is the indication to parse an (attr, value) pair.
    fn parse_property(&mut self, attr: i16) -> GdsResult<GdsProperty> {
        self.ctx_stack.push(GdsContext::Property);
        let value = match self.next()? {
            GdsRecord::PropValue(v) => v,
            _ => return self.fail("Gds Property without PropValue"),
        };
        self.ctx_stack.pop();
        Ok(GdsProperty { attr, value })
    }
    /// Fail on a record that does not belong here
    fn invalid<T>(&mut self, record: GdsRecord) -> GdsResult<T> {
        Err(GdsError::Parse {
            msg: "Invalid GDS Record".into(),
            record,
            recordnum: self.numread,
            bytepos: self.rdr.pos(),
            ctx: self.ctx_stack.clone(),
        })
    }
    /// Build a Parse error at the current position
    fn err(&mut self, msg: impl Into<String>) -> GdsError {
        GdsError::Parse {
            msg: msg.into(),
            record: self.peek().clone(),
            recordnum: self.numread,
            bytepos: self.rdr.pos(),
            ctx: self.ctx_stack.clone(),
        }
    }
    /// Return failure
    fn fail<T>(&mut self, msg: impl Into<String>) -> GdsResult<T> {
        Err(self.err(msg))
    }
}
