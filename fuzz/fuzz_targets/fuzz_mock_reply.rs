#![no_main]
use libfuzzer_sys::fuzz_target;
use supportbot::agent::intents::{classify, mock_reply, Intent};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let reply = mock_reply(s);
        assert_eq!(reply, mock_reply(s));
        if classify(s) == Intent::Fallback {
            assert!(reply.contains(s));
        }
    }
});
