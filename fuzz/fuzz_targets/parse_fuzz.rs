//! Parse fuzz target: feed arbitrary bytes to a representative construct.
//! Parsing must never panic; it returns Ok(value) or Err(error).
//! Build with: cargo fuzz run parse_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use binform::{
        BitFields, Bytes, Const, Construct, Contextual, If, Integer, Line, Prefixed, Repeat,
        Struct,
    };

    let root = Struct::new()
        .field("magic", Const::new(b"FZ".to_vec()))
        .field("flags", BitFields::new([("version", 3), ("kind", 5)]))
        .field("name", Line::new())
        .field("length", Integer::new(1))
        .field(
            "body",
            Contextual::new(|ctx| Ok(Box::new(Bytes::new(ctx.uint("length")?)))),
        )
        .field(
            "tail",
            If::new(
                |ctx| Ok(ctx.uint("length")? > 4),
                Prefixed::new(Integer::new(2), Repeat::new(Integer::new(1))),
            ),
        );

    let _ = root.parse(data);
    let _ = root.parse_strict(data);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parse_fuzz");
}
