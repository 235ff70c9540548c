#![no_main]

use canopy_protocol::{command::OperatorCommand, frame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Neither decoder may panic on arbitrary input
    if let Ok(packet) = frame::decode(data) {
        let encoded = frame::encode(&packet).expect("decoded packet must encode");
        assert_eq!(frame::decode(&encoded), Ok(packet));
    }

    if let Ok(line) = std::str::from_utf8(data) {
        let _ = OperatorCommand::parse(line);
    }
});
