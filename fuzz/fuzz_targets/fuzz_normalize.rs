#![no_main]

use libfuzzer_sys::fuzz_target;

use tdsnmp::normalize::normalize;
use tdsnmp::oid::Oid;
use tdsnmp::strings::strip_non_printable;

fuzz_target!(|data: &[u8]| {
    let _ = Oid::from_ber(data);

    if let Ok(s) = std::str::from_utf8(data) {
        let (name, index) = normalize(s, None);
        if let Some(index) = index {
            assert!(!index.is_empty());
            assert!(s.len() >= name.len() + index.len());
        }
        let _ = Oid::parse(s);

        let once = strip_non_printable(s).into_owned();
        assert_eq!(strip_non_printable(&once), once);
    }
});
