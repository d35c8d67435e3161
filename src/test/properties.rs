//! 随机种子与故障率下的性质测试

use super::support::{chunks, texts};
use crate::config::{SimConfig, TrafficConfig};
use crate::control::{RunOutcome, Session, StopCondition};
use crate::link::{Endpoint, FaultRates, SeqSpace};
use crate::proto::ProtocolKind;
use crate::viz::{LogKind, WindowSide};
use proptest::prelude::*;

const TEXT_A: &str = "the quick brown fox jumps over the lazy dog";
const TEXT_B: &str = "pack my box with five dozen jugs";

fn lossy_protocol() -> impl Strategy<Value = ProtocolKind> {
    prop_oneof![
        Just(ProtocolKind::Par),
        Just(ProtocolKind::OneBitSlidingWindow),
        Just(ProtocolKind::GoBackN),
        Just(ProtocolKind::SelectiveRepeat),
    ]
}

fn faults() -> impl Strategy<Value = FaultRates> {
    (0.0f64..0.35, 0.0f64..0.2, 0.0f64..0.2).prop_map(|(loss, corrupt, duplicate)| FaultRates {
        loss,
        corrupt,
        duplicate,
    })
}

/// 序号位数与 `1..=2^(k-1)` 内的窗口
fn seq_and_window() -> impl Strategy<Value = (u32, u32)> {
    (1u32..=4).prop_flat_map(|bits| (Just(bits), 1u32..=(1 << (bits - 1))))
}

fn lossy_config(
    protocol: ProtocolKind,
    faults: FaultRates,
    (bits, window): (u32, u32),
    seed: u64,
) -> SimConfig {
    SimConfig {
        protocol,
        seq_bits: bits,
        window_size: window,
        faults,
        seed,
        traffic: TrafficConfig {
            a: TEXT_A.to_string(),
            b: TEXT_B.to_string(),
            chunk_bytes: 5,
        },
        ..SimConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// 有损信道上每个分组恰好按序交付一次
    #[test]
    fn delivery_is_exactly_once_and_in_order(
        protocol in lossy_protocol(),
        faults in faults(),
        space in seq_and_window(),
        seed in any::<u64>(),
    ) {
        let cfg = lossy_config(protocol, faults, space, seed);
        let mut session = Session::new(cfg).expect("config");
        let outcome = session.run_until(StopCondition::AllDelivered).expect("run");
        prop_assert_eq!(outcome, RunOutcome::Reached);

        // 把剩余的确认与定时器跑完，之后也不能再多交付
        session.run_until(StopCondition::Idle).expect("drain");
        prop_assert!(session.halted().is_none());
        prop_assert_eq!(texts(session.delivered(Endpoint::B)), chunks(TEXT_A, 5));
        if protocol.duplex() {
            prop_assert_eq!(texts(session.delivered(Endpoint::A)), chunks(TEXT_B, 5));
        } else {
            prop_assert!(session.delivered(Endpoint::A).is_empty());
        }
    }

    /// 选择重传：任意乱序与丢失下，接收缓冲都不超过窗口
    #[test]
    fn selective_repeat_buffers_stay_within_window(
        faults in faults(),
        space in seq_and_window(),
        seed in any::<u64>(),
    ) {
        let (bits, window) = space;
        let cfg = lossy_config(ProtocolKind::SelectiveRepeat, faults, space, seed);
        let mut session = Session::new(cfg).expect("config");
        session.run_until(StopCondition::Idle).expect("run");

        for e in session.log() {
            if let LogKind::WindowChanged(w) = &e.kind {
                prop_assert!(w.outstanding <= window, "{:?}", w);
                if w.side == WindowSide::Sender {
                    prop_assert!(w.outstanding == SeqSpace::with_bits(bits).distance(w.base, w.next_seq));
                }
            }
        }
    }

    /// 理想信道上的停等协议
    #[test]
    fn stop_and_wait_delivers_any_text(text in "[a-z ]{1,40}", seed in any::<u64>()) {
        let cfg = SimConfig {
            protocol: ProtocolKind::StopAndWait,
            seed,
            traffic: TrafficConfig {
                a: text.clone(),
                b: String::new(),
                chunk_bytes: 3,
            },
            ..SimConfig::default()
        };
        let mut session = Session::new(cfg).expect("config");
        prop_assert_eq!(session.run_until(StopCondition::Idle).expect("run"), RunOutcome::Reached);
        prop_assert_eq!(texts(session.delivered(Endpoint::B)), chunks(&text, 3));
        prop_assert_eq!(session.stats().retransmissions, 0);
    }

    #[test]
    fn between_agrees_with_unwrapped_arithmetic(bits in 1u32..=16, a in any::<u32>(), da in 0u32..70_000, dc in 0u32..70_000) {
        let s = SeqSpace::with_bits(bits);
        let m = s.modulus();
        let (da, dc) = (da % m, dc % m);
        let a = s.wrap(a);
        prop_assert_eq!(s.between(a, s.add(a, da), s.add(a, dc)), da < dc);
        prop_assert_eq!(s.distance(a, s.add(a, da)), da);
    }
}

const HEAVY: FaultRates = FaultRates {
    loss: 0.2,
    corrupt: 0.1,
    duplicate: 0.3,
};

/// 固定种子扫一遍：`bits`/`window` 下两种窗口协议都恰好按序交付
fn sweep(bits: u32, window: u32, seeds: std::ops::Range<u64>) {
    for protocol in [ProtocolKind::GoBackN, ProtocolKind::SelectiveRepeat] {
        for seed in seeds.clone() {
            let cfg = lossy_config(protocol, HEAVY, (bits, window), seed);
            let mut session = Session::new(cfg).expect("config");
            let outcome = session.run_until(StopCondition::AllDelivered).expect("run");
            assert_eq!(outcome, RunOutcome::Reached, "{protocol} seed={seed}");
            session.run_until(StopCondition::Idle).expect("drain");
            assert!(session.halted().is_none(), "{protocol} seed={seed}");
            assert_eq!(texts(session.delivered(Endpoint::B)), chunks(TEXT_A, 5), "{protocol} seed={seed}");
            assert_eq!(texts(session.delivered(Endpoint::A)), chunks(TEXT_B, 5), "{protocol} seed={seed}");
        }
    }
}

#[test]
fn default_sequence_space_survives_heavy_faults() {
    let cfg = lossy_config(ProtocolKind::SelectiveRepeat, HEAVY, (3, 4), 0);
    assert_eq!(cfg.seq_bits, SimConfig::default().seq_bits);
    assert_eq!(cfg.window_size, SimConfig::default().window_size);
    // 半个序号空间的窗口在乱序信道上会混淆，预设退回保序信道
    assert_eq!(cfg.reorders(), Ok(false));
    sweep(3, 4, 0..150);
}

#[test]
fn largest_window_survives_heavy_faults() {
    sweep(4, 8, 0..100);
}

#[test]
fn reordering_channel_survives_heavy_faults() {
    let cfg = lossy_config(ProtocolKind::GoBackN, HEAVY, (4, 2), 0);
    assert_eq!(cfg.reorders(), Ok(true));
    sweep(4, 2, 0..100);
    sweep(16, 4, 0..50);
}
