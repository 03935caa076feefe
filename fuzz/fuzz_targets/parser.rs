#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|source: &str| {
    let _ = lox::parse(source);
    let _ = lox::parse_unit(source);
    let _ = lox::is_incomplete(source);
});
