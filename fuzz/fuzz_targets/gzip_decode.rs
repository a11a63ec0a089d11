#![no_main]

use libfuzzer_sys::fuzz_target;
use steplog_ingest::decode_gzip;

const MAX_BYTES: u64 = 1024 * 1024;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = decode_gzip("fuzz", data, MAX_BYTES) {
        assert!(text.len() as u64 <= MAX_BYTES);
        let _ = text.lines();
    }
});
