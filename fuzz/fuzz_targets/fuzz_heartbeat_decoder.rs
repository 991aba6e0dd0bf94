//! Fuzz target: `HeartbeatMessage::decode` and `ReceiveQueue::push_frame`
//!
//! Arbitrary radio payloads must never panic the receive path.  Anything
//! that decodes must survive an encode/decode cycle unchanged, and the
//! queue must never hold more than its fixed depth.
//!
//! cargo fuzz run fuzz_heartbeat_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use espnow_failover::config::GroupId;
use espnow_failover::protocol::heartbeat::HeartbeatMessage;
use espnow_failover::protocol::queue::{RECEIVE_QUEUE_DEPTH, ReceiveQueue};
use espnow_failover::registry::MacAddress;

fuzz_target!(|data: &[u8]| {
    if let Ok(msg) = HeartbeatMessage::decode(data) {
        let again = HeartbeatMessage::decode(&msg.encode());
        assert_eq!(again.as_ref(), Ok(&msg), "decoded frame must re-encode losslessly");
    }

    let Ok(group) = GroupId::new("fuzz") else { return };
    let queue = ReceiveQueue::new(group, MacAddress([0; 6]));
    for chunk in data.chunks(28) {
        let _ = queue.push_frame(chunk);
    }
    let _ = queue.push_frame(data);
    assert!(queue.len() <= RECEIVE_QUEUE_DEPTH);
});
