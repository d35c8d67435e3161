//! 定时器表
//!
//! 每个所有者（端点 + 槽位）至多一个活动定时器：重新 arm 会取消并替换旧的，
//! 不会出现两个并存的定时器。每次 arm/cancel 周期内到期至多上报一次。
//!
//! 定时器本身不回调任何东西；到期由调度器在截止时刻唤醒世界后查询本表得到。

use super::endpoint::Endpoint;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

/// 同一端点内的定时器槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "slot", content = "seq", rename_all = "snake_case")]
pub enum TimerSlot {
    /// 重传定时器，按帧序号区分
    Frame(u32),
    /// 辅助确认定时器（没有反向数据可捎带时发送独立 ACK）
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerOwner {
    pub endpoint: Endpoint,
    pub slot: TimerSlot,
}

impl TimerOwner {
    pub fn new(endpoint: Endpoint, slot: TimerSlot) -> Self {
        Self { endpoint, slot }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub id: TimerId,
    pub deadline: SimTime,
    pub owner: TimerOwner,
    pub active: bool,
}

/// `arm` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Armed {
    pub id: TimerId,
    pub deadline: SimTime,
    /// 被替换掉的旧定时器
    pub replaced: Option<TimerId>,
}

#[derive(Debug, Default)]
pub struct TimerTable {
    next_id: u64,
    live: BTreeMap<TimerOwner, Timer>,
}

impl TimerTable {
    pub fn arm(&mut self, deadline: SimTime, owner: TimerOwner) -> Armed {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let replaced = self
            .live
            .insert(
                owner,
                Timer {
                    id,
                    deadline,
                    owner,
                    active: true,
                },
            )
            .map(|old| old.id);
        trace!(?owner, ?id, ?deadline, ?replaced, "arm 定时器");
        Armed {
            id,
            deadline,
            replaced,
        }
    }

    /// 按 id 取消；id 已失效（触发过/被替换/被取消）时返回 None。
    pub fn cancel(&mut self, id: TimerId) -> Option<Timer> {
        let owner = self.live.values().find(|t| t.id == id)?.owner;
        self.cancel_owner(owner)
    }

    pub fn cancel_owner(&mut self, owner: TimerOwner) -> Option<Timer> {
        let mut t = self.live.remove(&owner)?;
        t.active = false;
        Some(t)
    }

    pub fn is_active(&self, owner: TimerOwner) -> bool {
        self.live.contains_key(&owner)
    }

    pub fn get(&self, owner: TimerOwner) -> Option<&Timer> {
        self.live.get(&owner)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// 取出截止时间已到的最早一个定时器（同截止时间按 id），并使其失效。
    pub fn next_expired(&mut self, now: SimTime) -> Option<Timer> {
        let owner = self
            .live
            .values()
            .filter(|t| t.deadline <= now)
            .min_by_key(|t| (t.deadline, t.id))?
            .owner;
        self.cancel_owner(owner)
    }

    /// 批量形式：返回所有已到期定时器的所有者，按 (截止时间, id) 排序。
    pub fn tick(&mut self, now: SimTime) -> Vec<TimerOwner> {
        std::iter::from_fn(|| self.next_expired(now))
            .map(|t| t.owner)
            .collect()
    }

    /// 取消全部定时器（停止/拆除实例时使用）
    pub fn cancel_all(&mut self) -> Vec<Timer> {
        let mut all: Vec<Timer> = std::mem::take(&mut self.live).into_values().collect();
        all.sort_by_key(|t| t.id);
        for t in &mut all {
            t.active = false;
        }
        all
    }
}
