//! 统计信息
//!
//! 每个实例一份计数器，随日志一起供界面展示。

use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub frames_sent: u64,
    pub retransmissions: u64,
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub frames_corrupted: u64,
    pub frames_duplicated: u64,
    pub frames_discarded: u64,
    pub naks_sent: u64,
    pub timeouts: u64,
    pub packets_delivered: u64,
    pub bytes_delivered: u64,
}
