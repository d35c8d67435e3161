use super::support::{config, run_to_idle};
use crate::control::Command;
use crate::link::{Endpoint, FrameFilter};
use crate::proto::ProtocolKind;
use serde_json::Value;

fn entries(kind: &str, log: &[Value]) -> Vec<Value> {
    log.iter()
        .filter(|v| v["kind"] == kind)
        .cloned()
        .collect()
}

#[test]
fn log_entries_serialize_with_flat_snake_case_kind() {
    let session = run_to_idle(
        config(ProtocolKind::Par, "json", ""),
        &[Command::ForceDropNext(FrameFilter::data(Endpoint::A, 0))],
    );
    let json = serde_json::to_string(session.log()).expect("serialize log");
    let log: Vec<Value> = serde_json::from_str(&json).expect("parse log");

    assert!(log.iter().all(|v| v["instance_id"] == 1 && v["t_ns"].is_u64()));

    let dropped = entries("frame_dropped", &log);
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0]["forced"], true);
    assert_eq!(dropped[0]["from"], "A");
    assert_eq!(dropped[0]["frame_kind"], "DATA");
    assert_eq!(dropped[0]["seq"], 0);

    let armed = entries("timer_armed", &log);
    assert_eq!(armed[0]["slot"], "frame");
    assert_eq!(armed[0]["seq"], 0);
    assert_eq!(armed[0]["endpoint"], "A");

    let fired = entries("timer_fired", &log);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0]["t_ns"], 500_000_000u64);

    let resent = entries("frame_sent", &log)
        .into_iter()
        .filter(|v| v["retrans"] == true)
        .count();
    assert_eq!(resent, 1);

    let delivered = entries("packet_delivered", &log);
    assert_eq!(delivered[0]["text"], "json");
    assert_eq!(delivered[0]["endpoint"], "B");

    let window = entries("window_changed", &log);
    assert_eq!(window[0]["state"], "AWAITING_ACK");
    assert_eq!(window[0]["side"], "sender");
}

#[test]
fn log_timestamps_never_go_backwards() {
    let mut cfg = config(ProtocolKind::SelectiveRepeat, "monotonic time stamps", "both ways");
    cfg.faults.loss = 0.2;
    cfg.faults.duplicate = 0.2;
    cfg.seq_bits = 4;
    let session = run_to_idle(cfg, &[]);
    let stamps: Vec<u64> = session.log().iter().map(|e| e.t_ns).collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}
