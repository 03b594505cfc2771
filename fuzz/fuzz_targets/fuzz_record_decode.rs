#![no_main]

use libfuzzer_sys::fuzz_target;

use subledger_store::{AccountRecord, TransferRecord};
use subledger_types::{AccountId, Amount};

// Stored bytes and user-supplied strings must be rejected, never panic.
fuzz_target!(|data: &[u8]| {
    let _ = bincode::deserialize::<AccountRecord>(data);
    let _ = bincode::deserialize::<TransferRecord>(data);

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = s.parse::<Amount>();
        let _ = AccountId::parse(s);
    }
});
