#![no_main]

use libfuzzer_sys::fuzz_target;
use steplog_ingest::{NotificationDecoder, QueueMessage};

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };
    let message = QueueMessage {
        message_id: Some("fuzz".to_owned()),
        event_source: Some("aws:sqs".to_owned()),
        body: Some(body.to_owned()),
    };
    let _ = NotificationDecoder::new().decode_message(&message);
});
