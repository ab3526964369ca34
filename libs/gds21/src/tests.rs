use chrono::NaiveDate;

use crate::ser::SerializationFormat;
use crate::*;

/// Fixed dates, for byte-stable test libraries
fn test_dates() -> GdsDateTimes {
    let dt: GdsDateTime = NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 1))
        .unwrap()
        .into();
    GdsDateTimes {
        modified: dt,
        accessed: dt,
    }
}

/// A two-cell library: `TOP` instantiating `INV` once and as a 2x3 array
fn sample_lib() -> GdsLibrary {
    let inv = GdsStruct {
        name: "INV".into(),
        dates: test_dates(),
        elems: vec![
            GdsBoundary::rect(68, 20, (0, 0), (100, 200)).into(),
            GdsTextElem {
                string: "A".into(),
                layer: 68,
                texttype: 5,
                xy: GdsPoint::new(50, 50),
                ..Default::default()
            }
            .into(),
        ],
    };
    let top = GdsStruct {
        name: "TOP".into(),
        dates: test_dates(),
        elems: vec![
            GdsStructRef {
                name: "INV".into(),
                xy: GdsPoint::new(1_000, 0),
                strans: Some(GdsStrans {
                    reflected: true,
                    angle: Some(90.0),
                    ..Default::default()
                }),
                ..Default::default()
            }
            .into(),
            GdsArrayRef {
                name: "INV".into(),
                xy: [
                    GdsPoint::new(0, 0),
                    GdsPoint::new(200, 0),
                    GdsPoint::new(0, 600),
                ],
                cols: 2,
                rows: 3,
                ..Default::default()
            }
            .into(),
            GdsPath {
                layer: 67,
                datatype: 20,
                xy: GdsPoint::vec(&[(0, 0), (0, 1_000), (500, 1_000)]),
                width: Some(14),
                path_type: Some(0),
                ..Default::default()
            }
            .into(),
        ],
    };
    GdsLibrary {
        name: "sample".into(),
        version: 3,
        dates: test_dates(),
        units: GdsUnits::default(),
        structs: vec![inv, top],
        ..Default::default()
    }
}

/// Encode a single record to bytes
fn record_bytes(record: &GdsRecord) -> GdsResult<Vec<u8>> {
    let mut wr = GdsWriter::new(Vec::new());
    wr.write_record(record)?;
    Ok(wr.into_inner())
}

#[test]
fn floats() -> GdsResult<()> {
    // Conversions between IEEE and GDSII floating-point formats
    assert_eq!(GdsFloat64::encode(0.0), 0);
    assert_eq!(GdsFloat64::decode(0), 0.0);
    for val in [1.0, 1e-3, 1e-9, 1e-11, -0.69, -33.33e-33, 0.5, 16.0, 90.0, 1e6] {
        let d = GdsFloat64::decode(GdsFloat64::encode(val));
        assert!(((d - val) / val).abs() < 1e-15, "{val} decoded as {d}");
    }
    // Known encodings
    assert_eq!(GdsFloat64::encode(1.0), 0x4110_0000_0000_0000);
    assert_eq!(GdsFloat64::encode(-1.0), 0xC110_0000_0000_0000);
    Ok(())
}

#[test]
fn float_mantissas_stay_normalized() {
    // The leading hex digit of every encoded mantissa is nonzero,
    // and the mantissa never overflows into the exponent byte.
    for val in [1e-3, 1e-9, 0.1, 1.0 - f64::EPSILON, 15.999_999_999_999_998, 255.99999] {
        let enc = GdsFloat64::encode(val);
        let mantissa = enc & 0x00FF_FFFF_FFFF_FFFF;
        assert!(mantissa >= 1 << 52, "{val} encoded as {enc:#x}");
        let d = GdsFloat64::decode(enc);
        assert!(((d - val) / val).abs() < 1e-15);
    }
}

#[test]
fn empty_lib_roundtrip() -> GdsResult<()> {
    let mut lib = GdsLibrary::new("empty");
    lib.dates = test_dates();
    roundtrip(&lib)?;
    Ok(())
}

#[test]
fn sample_roundtrip() -> GdsResult<()> {
    let lib = sample_lib();
    roundtrip(&lib)?;
    assert_eq!(
        lib.stats(),
        GdsStats {
            libraries: 1,
            structs: 2,
            boundaries: 1,
            paths: 1,
            struct_refs: 1,
            array_refs: 1,
            text_elems: 1,
            nodes: 0,
            boxes: 0,
        }
    );
    Ok(())
}

#[test]
fn byte_stable() -> GdsResult<()> {
    // Writing, reading, and re-writing produces identical bytes
    let mut bytes1 = Vec::new();
    sample_lib().write(&mut bytes1)?;
    let lib = GdsLibrary::from_bytes(&bytes1)?;
    let mut bytes2 = Vec::new();
    lib.write(&mut bytes2)?;
    assert_eq!(bytes1, bytes2);
    Ok(())
}

#[test]
fn it_has_properties() -> GdsResult<()> {
    let mut lib = sample_lib();
    let mut rect = GdsBoundary::rect(1, 0, (0, 0), (10, 10));
    rect.properties = vec![
        GdsProperty {
            attr: 1,
            value: "net=vdd".into(),
        },
        GdsProperty {
            attr: 2,
            value: "odd".into(),
        },
    ];
    rect.elflags = Some(GdsElemFlags(0, 1));
    rect.plex = Some(GdsPlex(7));
    lib.structs[0].elems.push(rect.into());
    roundtrip(&lib)?;
    Ok(())
}

#[test]
fn it_keeps_library_metadata() -> GdsResult<()> {
    let mut lib = sample_lib();
    lib.libdirsize = Some(4);
    lib.srfname = Some("srf".into());
    lib.reflibs = Some("REFLIB".into());
    lib.fonts = Some("FONT0".into());
    lib.attrtable = Some("attrs".into());
    lib.generations = Some(3);
    lib.format_type = Some(GdsFormatType::Archive(0));
    roundtrip(&lib)?;
    Ok(())
}

#[test]
fn it_has_nodes_and_boxes() -> GdsResult<()> {
    let mut lib = sample_lib();
    lib.structs[0].elems.push(
        GdsNode {
            layer: 3,
            nodetype: 1,
            xy: GdsPoint::vec(&[(0, 0), (5, 5)]),
            ..Default::default()
        }
        .into(),
    );
    lib.structs[0].elems.push(
        GdsBox {
            layer: 4,
            boxtype: 0,
            xy: [
                GdsPoint::new(0, 0),
                GdsPoint::new(1, 0),
                GdsPoint::new(1, 1),
                GdsPoint::new(0, 1),
                GdsPoint::new(0, 0),
            ],
            ..Default::default()
        }
        .into(),
    );
    roundtrip(&lib)?;
    assert_eq!(lib.stats().nodes, 1);
    assert_eq!(lib.stats().boxes, 1);
    Ok(())
}

#[test]
fn strings() -> GdsResult<()> {
    // Odd-length strings are padded with a NUL, and read back without it
    let bytes = record_bytes(&GdsRecord::StructName("abc".into()))?;
    assert_eq!(bytes, vec![0x00, 0x08, 0x06, 0x06, b'a', b'b', b'c', 0x00]);
    let mut rdr = GdsReader::new(bytes.as_slice());
    assert_eq!(rdr.read_record()?, GdsRecord::StructName("abc".into()));

    // Empty strings are header-only records
    let bytes = record_bytes(&GdsRecord::StructName(String::new()))?;
    assert_eq!(bytes.len(), 4);
    let mut rdr = GdsReader::new(bytes.as_slice());
    assert_eq!(rdr.read_record()?, GdsRecord::StructName(String::new()));
    Ok(())
}

#[test]
fn record_too_long() {
    let rec = GdsRecord::Xy(vec![0; 20_000]);
    assert!(matches!(record_bytes(&rec), Err(GdsError::RecordLen(_))));
}

#[test]
fn invalid_records() {
    // XY content which is not a whole number of i32s
    let bytes = [0x00, 0x0A, 0x10, 0x03, 0, 0, 0, 0, 0, 0];
    let mut rdr = GdsReader::new(&bytes[..]);
    assert!(matches!(
        rdr.read_record(),
        Err(GdsError::RecordDecode(GdsRecordType::Xy, GdsDataType::I32, 6))
    ));

    // Record-length shorter than the header
    let bytes = [0x00, 0x02, 0x00, 0x02];
    let mut rdr = GdsReader::new(&bytes[..]);
    assert!(matches!(rdr.read_record(), Err(GdsError::RecordLen(2))));

    // Unknown record-type
    let bytes = [0x00, 0x04, 0xEE, 0x00];
    let mut rdr = GdsReader::new(&bytes[..]);
    assert!(matches!(
        rdr.read_record(),
        Err(GdsError::InvalidRecordType(0xEE))
    ));

    // Deprecated record-type
    let bytes = [0x00, 0x04, GdsRecordType::Spacing as u8, 0x00];
    let mut rdr = GdsReader::new(&bytes[..]);
    assert!(matches!(rdr.read_record(), Err(GdsError::InvalidRecordType(_))));
}

#[test]
fn truncated_stream() -> GdsResult<()> {
    let mut bytes = Vec::new();
    sample_lib().write(&mut bytes)?;
    // Drop the trailing ENDLIB record
    bytes.truncate(bytes.len() - 4);
    let err = GdsLibrary::from_bytes(&bytes).unwrap_err();
    assert!(err.to_string().contains("ENDLIB"), "{err}");
    // And an empty stream is no library at all
    assert!(GdsLibrary::from_bytes(&[]).is_err());
    Ok(())
}

#[test]
fn unsupported_library_security() -> GdsResult<()> {
    let mut bytes = Vec::new();
    let mut wr = GdsWriter::new(&mut bytes);
    wr.write_record(&GdsRecord::Header { version: 3 })?;
    wr.write_record(&GdsRecord::BgnLib {
        dates: test_dates().encode(),
    })?;
    wr.write_record(&GdsRecord::LibSecur(1))?;
    wr.write_record(&GdsRecord::LibName("lib".into()))?;
    wr.write_record(&GdsRecord::Units(1e-3, 1e-9))?;
    wr.write_record(&GdsRecord::EndLib)?;
    assert!(matches!(
        GdsLibrary::from_bytes(&bytes),
        Err(GdsError::Unsupported(Some(GdsRecord::LibSecur(1)), _))
    ));
    Ok(())
}

#[test]
fn elements_out_of_place() -> GdsResult<()> {
    // A LAYER record directly inside a struct is a parse error
    let mut bytes = Vec::new();
    let mut wr = GdsWriter::new(&mut bytes);
    wr.write_record(&GdsRecord::Header { version: 3 })?;
    wr.write_record(&GdsRecord::BgnLib {
        dates: test_dates().encode(),
    })?;
    wr.write_record(&GdsRecord::LibName("lib".into()))?;
    wr.write_record(&GdsRecord::Units(1e-3, 1e-9))?;
    wr.write_record(&GdsRecord::BgnStruct {
        dates: test_dates().encode(),
    })?;
    wr.write_record(&GdsRecord::StructName("cell".into()))?;
    wr.write_record(&GdsRecord::Layer(1))?;
    wr.write_record(&GdsRecord::EndStruct)?;
    wr.write_record(&GdsRecord::EndLib)?;
    match GdsLibrary::from_bytes(&bytes) {
        Err(GdsError::Parse { record, ctx, .. }) => {
            assert_eq!(record, GdsRecord::Layer(1));
            assert_eq!(ctx, vec![GdsContext::Library, GdsContext::Struct]);
        }
        other => panic!("Expected a parse error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn dates() -> GdsResult<()> {
    let dates = test_dates();
    let encoded = dates.encode();
    assert_eq!(encoded, [70, 1, 1, 0, 0, 1, 70, 1, 1, 0, 0, 1]);
    assert_eq!(GdsDateTimes::parse(&encoded)?, dates);
    let back: chrono::NaiveDateTime = dates.modified.try_into()?;
    assert_eq!(back.to_string(), "1970-01-01 00:00:01");

    // Zeroed dates, as written by plenty of tools, are kept as-is
    let zeros = GdsDateTimes::parse(&[0; 12])?;
    assert_eq!(zeros.encode(), [0; 12]);
    let bad: GdsResult<chrono::NaiveDateTime> = zeros.modified.try_into();
    assert!(bad.is_err());
    Ok(())
}

#[test]
fn struct_refs() {
    let lib = sample_lib();
    let top = lib.find_struct("TOP").unwrap();
    let names: Vec<&str> = top.struct_ref_names().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["INV", "INV"]);
    assert!(lib.find_struct("nope").is_none());
}

#[test]
fn json_and_yaml() -> GdsResult<()> {
    let lib = sample_lib();
    for fmt in [SerializationFormat::Json, SerializationFormat::Yaml] {
        let s = fmt.to_string(&lib)?;
        let lib2: GdsLibrary = fmt.from_str(&s)?;
        assert_eq!(lib, lib2);
    }
    Ok(())
}

#[test]
fn builders() -> GdsResult<()> {
    let b = GdsBoundaryBuilder::default()
        .layer(1i16)
        .datatype(0i16)
        .xy(GdsPoint::vec(&[(0, 0), (1, 0), (1, 1), (0, 0)]))
        .build()?;
    assert!(b.properties.is_empty());
    assert_eq!((b.layer, b.datatype), (1, 0));
    // Missing required fields fail
    assert!(GdsBoundaryBuilder::default().layer(1i16).build().is_err());
    Ok(())
}
