#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use tdsnmp::message::{Message, V3Message};
use tdsnmp::mib::StaticMib;
use tdsnmp::v3::{UsmSecurityParams, find_auth_params_offset};
use tdsnmp::{DisplayOptions, SnmpVariable};

// Everything an agent reply passes through before reaching a caller.
fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);
    let mib = StaticMib::standard();
    let sprint = DisplayOptions {
        use_sprint_value: true,
        use_enums: true,
        ..DisplayOptions::default()
    };

    match Message::decode(bytes.clone()) {
        Ok(Message::Community(msg)) => {
            for vb in &msg.pdu.varbinds {
                let _ = SnmpVariable::from_varbind(vb, &mib, &DisplayOptions::default()).to_string();
                let _ = SnmpVariable::from_varbind(vb, &mib, &sprint).to_string();
            }
        }
        Ok(Message::V3(msg)) => {
            let _ = UsmSecurityParams::decode(msg.security_params.clone());
            let _ = find_auth_params_offset(data);
        }
        Err(_) => {
            let _ = V3Message::decode(bytes);
        }
    }
});
