//! 数据链路协议仿真
//!
//! 选择协议、设置信道故障与窗口，运行到全部分组交付（或用完事件预算），
//! 打印一行摘要，可选地把事件日志写成 JSON 数组。

use arq_sim::config::SimConfig;
use arq_sim::control::{Command, RunOutcome, Session, StopCondition};
use arq_sim::error::SimError;
use arq_sim::link::Endpoint;
use clap::Parser;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "arq_sim", about = "数据链路层 ARQ 协议仿真（协议 1..6）")]
struct Args {
    /// 协议编号 1..6
    #[arg(long)]
    protocol: Option<u8>,
    /// 窗口型协议的序号位数
    #[arg(long)]
    seq_bits: Option<u32>,
    #[arg(long)]
    window: Option<u32>,
    #[arg(long)]
    loss: Option<f64>,
    #[arg(long)]
    corrupt: Option<f64>,
    #[arg(long)]
    duplicate: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    min_delay_ms: Option<u64>,
    #[arg(long)]
    max_delay_ms: Option<u64>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[arg(long)]
    ack_timeout_ms: Option<u64>,
    /// 选择重传不发送 NAK
    #[arg(long, default_value_t = false)]
    no_nak: bool,
    /// A 端要发送的文本
    #[arg(long)]
    payload_a: Option<String>,
    /// B 端要发送的文本（仅双向协议）
    #[arg(long)]
    payload_b: Option<String>,
    #[arg(long)]
    max_events: Option<u64>,
    /// JSON 配置文件，命令行参数覆盖其中的字段
    #[arg(long)]
    config: Option<PathBuf>,
    /// 输出事件日志 JSON
    #[arg(long)]
    log_json: Option<PathBuf>,
}

impl Args {
    fn base_config(&self) -> Result<SimConfig, Box<dyn Error>> {
        let mut cfg = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => SimConfig::default(),
        };
        if let Some(v) = self.seq_bits {
            cfg.seq_bits = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if let Some(v) = self.min_delay_ms {
            cfg.min_delay_ms = v;
        }
        if let Some(v) = self.max_delay_ms {
            cfg.max_delay_ms = v;
        }
        if let Some(v) = self.timeout_ms {
            cfg.timeout_ms = v;
        }
        if let Some(v) = self.ack_timeout_ms {
            cfg.ack_timeout_ms = v;
        }
        if self.no_nak {
            cfg.nak = false;
        }
        if let Some(v) = &self.payload_a {
            cfg.traffic.a = v.clone();
        }
        if let Some(v) = &self.payload_b {
            cfg.traffic.b = v.clone();
        }
        if let Some(v) = self.max_events {
            cfg.max_events = v;
        }
        Ok(cfg)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut session = Session::new(args.base_config()?)?;

    if let Some(id) = args.protocol {
        session.apply(Command::SelectProtocol(id))?;
    }
    if args.loss.is_some() || args.corrupt.is_some() || args.duplicate.is_some() {
        let current = session.config().faults;
        session.apply(Command::SetFaultRates {
            loss: args.loss.unwrap_or(current.loss),
            corrupt: args.corrupt.unwrap_or(current.corrupt),
            duplicate: args.duplicate.unwrap_or(current.duplicate),
        })?;
    }
    if let Some(size) = args.window {
        session.apply(Command::SetWindowSize(size))?;
    }

    session.apply(Command::Start)?;
    let outcome = session.run_until(StopCondition::AllDelivered)?;
    if outcome == RunOutcome::Reached {
        // 让剩余的确认与定时器自然结束
        session.run_until(StopCondition::Idle)?;
    }

    let stats = session.stats();
    println!(
        "done @ {:?}, protocol={}, outcome={:?}, delivered={}, delivered_a={}, delivered_b={}, frames_sent={}, retransmissions={}, timeouts={}, dropped={}, corrupted={}",
        session.now(),
        session.protocol().id(),
        outcome,
        stats.packets_delivered,
        session.delivered(Endpoint::A).len(),
        session.delivered(Endpoint::B).len(),
        stats.frames_sent,
        stats.retransmissions,
        stats.timeouts,
        stats.frames_dropped,
        stats.frames_corrupted,
    );

    if let Some(path) = args.log_json {
        let json = serde_json::to_string_pretty(session.log())?;
        fs::write(&path, json)?;
    }
    // 日志先落盘，被拆除的实例仍可回放
    if let Some(err) = session.halted() {
        return Err(SimError::from(err.clone()).into());
    }
    Ok(())
}
