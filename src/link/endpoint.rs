//! 端点标识
//!
//! 点对点链路只有两端：A 与 B。单工协议中 A 发送、B 接收。

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    A,
    B,
}

impl Endpoint {
    pub const ALL: [Endpoint; 2] = [Endpoint::A, Endpoint::B];

    /// 链路另一端
    pub fn peer(self) -> Endpoint {
        match self {
            Endpoint::A => Endpoint::B,
            Endpoint::B => Endpoint::A,
        }
    }

    /// 用作 `[T; 2]` 的下标
    pub fn index(self) -> usize {
        match self {
            Endpoint::A => 0,
            Endpoint::B => 1,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::A => f.write_str("A"),
            Endpoint::B => f.write_str("B"),
        }
    }
}
