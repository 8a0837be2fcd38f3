//! Per-construct behavior: leaves, adapters, strings, conditionals,
//! bit fields, stream manipulators, and the failure contract.

use binform::{
    record, shared, Adapted, Aligned, BitFields, Bytes, CString, Checksum, Computed, Const,
    Construct, Context, Debug, Endianness, Enum, ErrorKind, Flag, Float, If, Integer, Line, Offset,
    PadDirection, Padded, PaddedString, Padding, PascalString, Pass, Prefixed, Raise, Repeat,
    RepeatExactly, Stream, Struct, Switch, Tell, TextEncoding, Value,
};

// ==================== Leaves ====================

#[test]
fn pass_is_empty() {
    assert_eq!(Pass.parse(b"anything").expect("parse"), Value::Unit);
    assert_eq!(Pass.build(&Value::Unit).expect("build"), b"");
    assert_eq!(Pass.size().expect("size"), 0);
}

#[test]
fn flag_zero_is_false_nonzero_is_true() {
    assert_eq!(Flag.parse(b"\x00").expect("parse"), Value::Bool(false));
    assert_eq!(Flag.parse(b"\x10").expect("parse"), Value::Bool(true));
    assert_eq!(Flag.build(&Value::Bool(true)).expect("build"), b"\x01");
    assert_eq!(Flag.build(&Value::Bool(false)).expect("build"), b"\x00");
}

#[test]
fn bytes_fixed_length() {
    let b = Bytes::new(3);
    assert_eq!(b.parse(b"bar").expect("parse"), Value::Bytes(b"bar".to_vec()));
    assert_eq!(b.build(&Value::Bytes(b"foo".to_vec())).expect("build"), b"foo");
    assert_eq!(b.size().expect("size"), 3);

    let err = b.build(&Value::Bytes(b"foobar".to_vec())).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::LengthMismatch { declared: 3, actual: 6 }
    ));

    let err = b.parse(b"xy").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnexpectedEnd { .. }));
}

#[test]
fn bytes_greedy_consumes_everything() {
    let b = Bytes::greedy();
    assert_eq!(
        b.parse(b"foobar").expect("parse"),
        Value::Bytes(b"foobar".to_vec())
    );
    assert!(matches!(b.size().unwrap_err().kind(), ErrorKind::SizeofUnknown(_)));
}

#[test]
fn integer_widths_and_endianness() {
    assert_eq!(Integer::new(1).parse(b"\x10").expect("parse"), Value::Uint(16));
    assert_eq!(
        Integer::new(2).build(&Value::Uint(0xff)).expect("build"),
        b"\x00\xff"
    );
    assert_eq!(
        Integer::with(2, false, Endianness::Little)
            .build(&Value::Uint(0xff))
            .expect("build"),
        b"\xff\x00"
    );
    assert_eq!(
        Integer::with(2, true, Endianness::Little)
            .build(&Value::Int(-0x10ff))
            .expect("build"),
        b"\x01\xef"
    );
    assert_eq!(
        Integer::with(2, true, Endianness::Big)
            .parse(b"\xff\xfe")
            .expect("parse"),
        Value::Int(-2)
    );
}

#[test]
fn integer_out_of_range() {
    let err = Integer::new(1).build(&Value::Uint(256)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::OutOfRange { value: 256, bits: 8 }));

    let err = Integer::new(1).build(&Value::Int(-1)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::OutOfRange { value: -1, bits: 8 }));

    // Signed boundaries.
    let sig = Integer::with(1, true, Endianness::Big);
    assert_eq!(sig.build(&Value::Int(-128)).expect("build"), b"\x80");
    assert!(sig.build(&Value::Int(128)).is_err());
}

#[test]
fn float_round_trip() {
    let f = Float::new(4);
    let bytes = f.build(&Value::F32(2.2)).expect("build");
    assert_eq!(bytes, b"\x40\x0c\xcc\xcd");
    assert_eq!(f.parse(&bytes).expect("parse"), Value::F32(2.2));

    let d = Float::with(8, Endianness::Little);
    let bytes = d.build(&Value::F64(-1970.31415)).expect("build");
    assert_eq!(d.parse(&bytes).expect("parse"), Value::F64(-1970.31415));
}

#[test]
fn padding_ignores_content() {
    let p = Padding::new(4);
    assert_eq!(p.parse(b"\xde\xad\xbe\xef").expect("parse"), Value::Unit);
    // The build input is irrelevant.
    assert_eq!(
        p.build(&Value::Bytes(b"junk".to_vec())).expect("build"),
        b"\x00\x00\x00\x00"
    );
    assert_eq!(p.size().expect("size"), 4);
}

#[test]
fn const_verifies_on_parse() {
    let c = Const::new(b"SIGNATURE".to_vec());
    assert_eq!(c.build(&Value::Unit).expect("build"), b"SIGNATURE");
    assert_eq!(
        c.parse(b"SIGNATURE").expect("parse"),
        Value::Bytes(b"SIGNATURE".to_vec())
    );
    let err = c.parse(b"SIGNATURF").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ConstMismatch { .. }));

    let err = c.build(&Value::Bytes(b"OTHER".to_vec())).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ConstMismatch { .. }));
}

#[test]
fn const_with_arbitrary_construct() {
    let c = Const::with(Flag, Value::Bool(true));
    assert_eq!(c.build(&Value::Unit).expect("build"), b"\x01");
    assert!(c.parse(b"\x00").is_err());
    assert_eq!(c.parse(b"\x01").expect("parse"), Value::Bool(true));
}

// ==================== Adapters ====================

#[test]
fn adapted_transforms_both_directions() {
    let yesno = Adapted::new(Flag)
        .before_build(|v| Ok(Value::Bool(v.as_str() == Some("yes"))))
        .after_parse(|v| {
            Ok(Value::Str(
                if v.as_bool().unwrap_or(false) { "yes" } else { "no" }.to_string(),
            ))
        });
    assert_eq!(yesno.build(&Value::Str("yes".into())).expect("build"), b"\x01");
    assert_eq!(yesno.parse(b"\x00").expect("parse"), Value::Str("no".into()));
    assert_eq!(yesno.size().expect("size"), 1);
}

#[test]
fn adapter_failure_carries_cause() {
    let broken = Adapted::new(Flag).after_parse(|_| Err("no dice".to_string()));
    let err = broken.parse(b"\x01").unwrap_err();
    match err.kind() {
        ErrorKind::Adapter(cause) => assert_eq!(cause, "no dice"),
        other => panic!("unexpected kind: {other:?}"),
    }
}

#[test]
fn repeat_greedy_stops_at_clean_failure() {
    let r = Repeat::new(Integer::new(1));
    assert_eq!(
        r.parse(b"\x01\x02\x03").expect("parse"),
        Value::List(vec![Value::Uint(1), Value::Uint(2), Value::Uint(3)])
    );
    assert_eq!(r.parse(b"").expect("parse"), Value::List(vec![]));
    assert_eq!(
        r.build(&Value::List(vec![Value::Uint(7), Value::Uint(8)]))
            .expect("build"),
        b"\x07\x08"
    );
    assert!(matches!(r.size().unwrap_err().kind(), ErrorKind::SizeofUnknown(_)));
}

#[test]
fn repeat_bounded_enforces_count() {
    let r = Repeat::bounded(Flag, 1, 4);
    assert_eq!(
        r.build(&Value::List(vec![Value::Bool(true), Value::Bool(true)]))
            .expect("build"),
        b"\x01\x01"
    );
    // Parse caps at max - 1 items even with more input available.
    assert_eq!(
        r.parse(b"\x00\x01\x00\x01").expect("parse"),
        Value::List(vec![Value::Bool(false), Value::Bool(true), Value::Bool(false)])
    );
    let err = r.build(&Value::List(vec![])).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LengthMismatch { .. }));

    let min = Repeat::bounded(Flag, 3, 5);
    assert!(min.parse(b"\x01\x01").is_err());
}

#[test]
fn repeat_until_keeps_terminating_item() {
    let r = Repeat::new(Bytes::new(1)).until(|items| {
        Ok(items
            .last()
            .and_then(Value::as_bytes)
            .map_or(false, |b| b == b"\x00"))
    });
    let mut stream = Stream::reader(b"ab\x00cd".to_vec());
    let mut ctx = Context::new();
    let parsed = r.parse_stream(&mut stream, &mut ctx).expect("parse");
    assert_eq!(
        parsed,
        Value::List(vec![
            Value::Bytes(b"a".to_vec()),
            Value::Bytes(b"b".to_vec()),
            Value::Bytes(b"\x00".to_vec()),
        ])
    );
    assert_eq!(stream.position(), 3);
}

#[test]
fn repeat_exactly_has_known_size() {
    let r = RepeatExactly::new(Integer::new(2), 3);
    assert_eq!(r.size().expect("size"), 6);
    let err = r
        .build(&Value::List(vec![Value::Uint(1)]))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LengthMismatch { .. }));
    assert_eq!(
        r.parse(b"\x00\x01\x00\x02\x00\x03").expect("parse"),
        Value::List(vec![Value::Uint(1), Value::Uint(2), Value::Uint(3)])
    );
}

#[test]
fn prefixed_frames_greedy_payload() {
    let p = Prefixed::new(Integer::new(1), Bytes::greedy());
    assert_eq!(p.build(&Value::Bytes(b"foo".to_vec())).expect("build"), b"\x03foo");
    assert_eq!(
        p.parse(b"\x06foobar").expect("parse"),
        Value::Bytes(b"foobar".to_vec())
    );
    let err = p.parse(b"\x06baz").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnexpectedEnd { .. }));
}

#[test]
fn prefixed_rejects_partially_consumed_window() {
    // The window is 3 bytes but the payload reads only 2.
    let p = Prefixed::new(Integer::new(1), Bytes::new(2));
    let err = p.parse(b"\x03abc").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Framing(_)));
}

#[test]
fn padded_window_and_overflow() {
    let p = Padded::new(6, Bytes::new(3));
    assert_eq!(
        p.build(&Value::Bytes(b"foo".to_vec())).expect("build"),
        b"foo\x00\x00\x00"
    );
    assert_eq!(
        p.parse(b"bar\x01\x02\x03").expect("parse"),
        Value::Bytes(b"bar".to_vec())
    );
    assert_eq!(p.size().expect("size"), 6);

    let tight = Padded::new(2, Bytes::new(3));
    let err = tight.build(&Value::Bytes(b"foo".to_vec())).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LengthMismatch { .. }));
}

#[test]
fn aligned_rounds_up() {
    let a = Aligned::new(4, Bytes::new(6));
    assert_eq!(a.size().expect("size"), 8);
    assert_eq!(
        a.build(&Value::Bytes(b"foobar".to_vec())).expect("build"),
        b"foobar\x00\x00"
    );
    // Padding content is skipped, not verified.
    let mut stream = Stream::reader(b"foobar\x00\x01xx".to_vec());
    let mut ctx = Context::new();
    let parsed = a.parse_stream(&mut stream, &mut ctx).expect("parse");
    assert_eq!(parsed, Value::Bytes(b"foobar".to_vec()));
    assert_eq!(stream.position(), 8);

    // Already aligned: no padding at all.
    let exact = Aligned::new(3, Bytes::new(6));
    assert_eq!(exact.size().expect("size"), 6);
}

// ==================== Strings ====================

#[test]
fn padded_string_strips_padding() {
    let s = PaddedString::new(8, TextEncoding::Utf8);
    assert_eq!(
        s.build(&Value::Str("foo".into())).expect("build"),
        b"foo\x00\x00\x00\x00\x00"
    );
    assert_eq!(
        s.parse(b"foo\x00\x00\x00\x00\x00").expect("parse"),
        Value::Str("foo".into())
    );
    assert_eq!(s.size().expect("size"), 8);

    let err = s.build(&Value::Str("much too long".into())).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LengthMismatch { .. }));
}

#[test]
fn padded_string_directions() {
    let left = PaddedString::new(6, TextEncoding::Ascii)
        .pad_byte(b'X')
        .direction(PadDirection::Left);
    assert_eq!(left.build(&Value::Str("bar".into())).expect("build"), b"XXXbar");
    assert_eq!(left.parse(b"XXXabc").expect("parse"), Value::Str("abc".into()));

    let center = PaddedString::new(6, TextEncoding::Ascii)
        .pad_byte(b'Y')
        .direction(PadDirection::Center);
    assert_eq!(center.build(&Value::Str("baz".into())).expect("build"), b"YbazYY");
    assert_eq!(center.parse(b"YYdefY").expect("parse"), Value::Str("def".into()));
}

#[test]
fn pascal_string_length_prefix() {
    let p = PascalString::new(Integer::new(1), TextEncoding::Utf8);
    assert_eq!(p.build(&Value::Str("foo".into())).expect("build"), b"\x03foo");
    assert_eq!(
        p.parse(b"\x08\xd0\x98\xd0\xb2\xd0\xb0\xd0\xbd").expect("parse"),
        Value::Str("Иван".into())
    );
    assert!(matches!(p.size().unwrap_err().kind(), ErrorKind::SizeofUnknown(_)));
}

#[test]
fn cstring_terminates_at_nul() {
    let s = CString::new(TextEncoding::Utf8);
    assert_eq!(s.build(&Value::Str("foo".into())).expect("build"), b"foo\x00");
    assert_eq!(s.parse(b"bar\x00baz").expect("parse"), Value::Str("bar".into()));
    let err = s.parse(b"unterminated").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Framing(_)));
}

#[test]
fn line_requires_crlf() {
    let l = Line::new();
    assert_eq!(l.parse(b"OK\r\n").expect("parse"), Value::Str("OK".into()));
    assert_eq!(l.build(&Value::Str("OK".into())).expect("build"), b"OK\r\n");
    let err = l.parse(b"OK").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Framing(_)));
    // A bare LF is not a terminator.
    assert!(l.parse(b"OK\n").is_err());
}

#[test]
fn latin1_and_ascii_encodings() {
    let s = PaddedString::new(4, TextEncoding::Latin1);
    assert_eq!(s.build(&Value::Str("café".into())).expect("build"), b"caf\xe9");
    assert_eq!(s.parse(b"caf\xe9").expect("parse"), Value::Str("café".into()));

    let a = Line::with(TextEncoding::Ascii);
    let err = a.build(&Value::Str("café".into())).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Adapter(_)));
}

// ==================== Conditionals ====================

#[test]
fn if_picks_branch_from_context() {
    let i = If::new(
        |ctx| ctx.get("flag").and_then(Value::as_bool).ok_or("no flag".into()),
        Const::new(b"True".to_vec()),
    )
    .with_else(Const::new(b"False".to_vec()));

    let mut ctx = Context::seeded(record([("flag", true)]));
    assert_eq!(i.build_with(&Value::Unit, &mut ctx).expect("build"), b"True");
    assert_eq!(i.sizeof(&ctx).expect("sizeof"), 4);

    let mut ctx = Context::seeded(record([("flag", false)]));
    assert_eq!(i.build_with(&Value::Unit, &mut ctx).expect("build"), b"False");
    assert_eq!(i.sizeof(&ctx).expect("sizeof"), 5);
}

#[test]
fn if_without_else_is_empty_when_false() {
    let i = If::new(
        |ctx| ctx.get("flag").and_then(Value::as_bool).ok_or("no flag".into()),
        Const::new(b"True".to_vec()),
    );
    let mut ctx = Context::seeded(record([("flag", false)]));
    assert_eq!(i.build_with(&Value::Unit, &mut ctx).expect("build"), b"");
    assert_eq!(i.sizeof(&ctx).expect("sizeof"), 0);

    // An unevaluable predicate makes the size unknown, not an error kind
    // of its own.
    let empty = Context::new();
    assert!(matches!(
        i.sizeof(&empty).unwrap_err().kind(),
        ErrorKind::SizeofUnknown(_)
    ));
}

#[test]
fn switch_dispatches_and_rejects_unknown() {
    let s = Switch::new(|ctx| ctx.get("kind").cloned().ok_or("no kind".into()))
        .case(1u64, Integer::new(1))
        .case(2u64, Bytes::new(3));

    let mut ctx = Context::seeded(record([("kind", 1u64)]));
    assert_eq!(s.build_with(&Value::Uint(5), &mut ctx).expect("build"), b"\x05");

    let mut ctx = Context::seeded(record([("kind", 2u64)]));
    assert_eq!(s.sizeof(&ctx).expect("sizeof"), 3);

    let mut ctx = Context::seeded(record([("kind", 3u64)]));
    let err = s.build_with(&Value::Uint(5), &mut ctx).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::SwitchNoMatch(_)));
}

#[test]
fn switch_default_and_raise() {
    let lenient = Switch::new(|ctx| ctx.get("kind").cloned().ok_or("no kind".into()))
        .case(1u64, Integer::new(1))
        .default(Pass);
    let mut ctx = Context::seeded(record([("kind", 9u64)]));
    assert_eq!(lenient.build_with(&Value::Unit, &mut ctx).expect("build"), b"");

    let strict = Switch::new(|ctx| ctx.get("kind").cloned().ok_or("no kind".into()))
        .case(1u64, Integer::new(1))
        .default(Raise::new("unknown variant"));
    let mut ctx = Context::seeded(record([("kind", 9u64)]));
    let err = strict.build_with(&Value::Unit, &mut ctx).unwrap_err();
    match err.kind() {
        ErrorKind::Raised(msg) => assert_eq!(msg, "unknown variant"),
        other => panic!("unexpected kind: {other:?}"),
    }
}

#[test]
fn enum_maps_labels_to_raw_values() {
    let e = Enum::new(
        Flag,
        [("yes", Value::Bool(true)), ("no", Value::Bool(false))],
    );
    assert_eq!(e.build(&Value::Str("yes".into())).expect("build"), b"\x01");
    assert_eq!(e.parse(b"\x00").expect("parse"), Value::Str("no".into()));
    assert_eq!(e.size().expect("size"), 1);

    // The exact raw value is accepted as build input too.
    assert_eq!(e.build(&Value::Bool(true)).expect("build"), b"\x01");

    let err = e.build(&Value::Str("maybe".into())).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownEnumLabel(_)));
}

#[test]
fn enum_rejects_unmapped_wire_value() {
    let e = Enum::new(
        Bytes::new(3),
        [
            ("x", Value::Bytes(b"xxx".to_vec())),
            ("y", Value::Bytes(b"yyy".to_vec())),
        ],
    );
    let err = e.parse(b"zzz").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownEnumValue(_)));
}

// ==================== BitFields ====================

#[test]
fn bitfields_msb_first() {
    let b = BitFields::new([("a", 3), ("b", 5)]);
    assert_eq!(
        b.parse(b"\xa5").expect("parse"),
        Value::Record(record([("a", 5u64), ("b", 5u64)]))
    );
    assert_eq!(
        b.build(&Value::Record(record([("a", 5u64), ("b", 5u64)])))
            .expect("build"),
        b"\xa5"
    );
    let err = b
        .build(&Value::Record(record([("a", 8u64), ("b", 0u64)])))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::OutOfRange { value: 8, bits: 3 }));
}

#[test]
fn bitfields_span_byte_boundaries() {
    let b = BitFields::new([("foo", 12), ("bar", 5)]);
    assert_eq!(b.size().expect("size"), 3);
    assert_eq!(
        b.build(&Value::Record(record([("foo", 4095u64), ("bar", 31u64)])))
            .expect("build"),
        b"\xff\xff\x80"
    );
    assert_eq!(
        b.parse(b"\x09\x11\x00").expect("parse"),
        Value::Record(record([("foo", 145u64), ("bar", 2u64)]))
    );
}

#[test]
fn bitfields_underscore_padding() {
    let b = BitFields::new([("_pad", 7), ("flag", 1)]);
    let parsed = b.parse(b"\x01").expect("parse");
    let rec = parsed.as_record().expect("record");
    assert!(!rec.contains_key("_pad"));
    assert_eq!(rec["flag"], Value::Uint(1));
    // Omitted fields build as zero.
    assert_eq!(
        b.build(&Value::Record(record([("flag", 0u64)]))).expect("build"),
        b"\x00"
    );
}

// ==================== Stream manipulators ====================

#[test]
fn offset_restores_position() {
    let o = Offset::new(4, Bytes::new(1));
    assert_eq!(o.parse(b"abcdef").expect("parse"), Value::Bytes(b"e".to_vec()));
    assert_eq!(
        o.build(&Value::Bytes(b"Z".to_vec())).expect("build"),
        b"\x00\x00\x00\x00Z"
    );
    assert_eq!(o.size().expect("size"), 0);
}

#[test]
fn tell_reports_positions_inside_struct() {
    let s = Struct::new()
        .field("key", Bytes::new(3))
        .field("pos1", Tell)
        .field("value", Bytes::new(3))
        .field("pos2", Tell);
    let parsed = s.parse(b"foobar").expect("parse");
    assert_eq!(
        parsed,
        Value::Record(record([
            ("key", Value::Bytes(b"foo".to_vec())),
            ("pos1", Value::Uint(3)),
            ("value", Value::Bytes(b"bar".to_vec())),
            ("pos2", Value::Uint(6)),
        ]))
    );
    // Positions are recomputed on build; the caller need not provide them.
    let built = s
        .build(&Value::Record(record([
            ("key", Value::Bytes(b"foo".to_vec())),
            ("value", Value::Bytes(b"bar".to_vec())),
        ])))
        .expect("build");
    assert_eq!(built, b"foobar");
}

// ==================== Checksum ====================

fn sum8(data: &[u8]) -> Vec<u8> {
    vec![data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))]
}

#[test]
fn checksum_computes_and_verifies() {
    let c = Checksum::new(Bytes::new(1), sum8, |ctx| ctx.bytes("data").map(|b| b.to_vec()));

    let mut ctx = Context::seeded(record([("data", Value::Bytes(b"foo".to_vec()))]));
    let built = c.build_with(&Value::Unit, &mut ctx).expect("build");
    assert_eq!(built, sum8(b"foo"));

    let mut ctx = Context::seeded(record([("data", Value::Bytes(b"foo".to_vec()))]));
    assert_eq!(
        c.parse_with(&built, &mut ctx).expect("parse"),
        Value::Bytes(sum8(b"foo"))
    );

    // Verification failure on parse.
    let mut ctx = Context::seeded(record([("data", Value::Bytes(b"bar".to_vec()))]));
    let err = c.parse_with(&built, &mut ctx).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ChecksumMismatch { .. }));

    // A supplied value that disagrees with the computed digest is refused.
    let mut ctx = Context::seeded(record([("data", Value::Bytes(b"foo".to_vec()))]));
    let err = c
        .build_with(&Value::Bytes(vec![0xff]), &mut ctx)
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ChecksumMismatch { .. }));
}

// ==================== Sharing and diagnostics ====================

#[test]
fn shared_definition_reused_across_fields() {
    let byte = shared(Integer::new(1));
    let s = Struct::new().field("a", byte.clone()).field("b", byte);
    assert_eq!(
        s.parse(b"\x01\x02").expect("parse"),
        Value::Record(record([("a", 1u64), ("b", 2u64)]))
    );
}

#[test]
fn debug_wrapper_is_transparent() {
    let d = Debug::new("length", Integer::new(2));
    assert_eq!(d.parse(b"\x00\x07").expect("parse"), Value::Uint(7));
    assert_eq!(d.build(&Value::Uint(7)).expect("build"), b"\x00\x07");
    assert_eq!(d.size().expect("size"), 2);
    // Failures pass through untouched.
    assert!(matches!(
        d.parse(b"\x00").unwrap_err().kind(),
        ErrorKind::UnexpectedEnd { .. }
    ));
}

#[test]
fn computed_constant_value() {
    let s = Struct::new()
        .field("version", Computed::constant(2u64))
        .field("n", Integer::new(1));
    let parsed = s.parse(b"\x09").expect("parse");
    assert_eq!(
        parsed,
        Value::Record(record([("version", 2u64), ("n", 9u64)]))
    );
    // Nothing of the computed field reaches the wire.
    let built = s
        .build(&Value::Record(record([("n", Value::Uint(9))])))
        .expect("build");
    assert_eq!(built, b"\x09");
}

// ==================== Failure contract ====================

#[test]
fn failed_parse_rewinds_the_stream() {
    let item = Struct::new()
        .field("tag", Integer::new(1))
        .field("magic", Const::new(b"XY".to_vec()));
    let r = Repeat::new(item);

    // Second item fails at its Const; Repeat stops cleanly after one item
    // with the stream back at the item boundary.
    let mut stream = Stream::reader(b"\x01XY\x02XZ".to_vec());
    let mut ctx = Context::new();
    let parsed = r.parse_stream(&mut stream, &mut ctx).expect("parse");
    assert_eq!(parsed.as_list().map(<[Value]>::len), Some(1));
    assert_eq!(stream.position(), 3);
}

#[test]
fn error_path_names_the_failing_field() {
    let s = Struct::new().field(
        "header",
        Struct::new().field("magic", Const::new(b"AB".to_vec())),
    );
    let err = s.parse(b"AC").unwrap_err();
    assert_eq!(err.path(), "header.magic");
    assert!(matches!(err.kind(), ErrorKind::ConstMismatch { .. }));
    assert_eq!(err.position(), 0);
}

#[test]
fn strict_parse_rejects_trailing_bytes() {
    let i = Integer::new(1);
    assert_eq!(i.parse(b"\x01\x02").expect("parse"), Value::Uint(1));
    let err = i.parse_strict(b"\x01\x02").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Framing(_)));
    assert_eq!(i.parse_strict(b"\x01").expect("parse"), Value::Uint(1));
}

#[test]
fn missing_required_field_is_a_type_error() {
    let s = Struct::new().field("n", Integer::new(1));
    let err = s.build(&Value::Record(record::<Value>([]))).unwrap_err();
    assert_eq!(err.path(), "n");
    assert!(matches!(
        err.kind(),
        ErrorKind::Type { expected: "uint", found: "unit" }
    ));
}
