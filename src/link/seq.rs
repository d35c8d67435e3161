//! 序号空间与滑动窗口算术
//!
//! 所有 seq/ack 比较都基于模距离，绝不使用原始整数大小比较。

/// 大小为 `modulus` 的循环序号空间，序号取值 `0..modulus`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpace {
    modulus: u32,
}

impl SeqSpace {
    /// 模数至少为 1（模 1 的空间里序号恒为 0）。
    pub fn new(modulus: u32) -> Self {
        Self {
            modulus: modulus.max(1),
        }
    }

    /// `2^bits` 大小的空间；`bits` 由配置校验限制在 1..=16。
    pub fn with_bits(bits: u32) -> Self {
        Self::new(1u32 << bits.min(16))
    }

    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    /// 发送端窗口上限：`2^(k-1)`，即空间的一半（至少 1）。
    pub fn max_window(&self) -> u32 {
        (self.modulus / 2).max(1)
    }

    pub fn wrap(&self, n: u32) -> u32 {
        n % self.modulus
    }

    pub fn inc(&self, n: u32) -> u32 {
        self.add(n, 1)
    }

    pub fn dec(&self, n: u32) -> u32 {
        let m = self.modulus;
        (self.wrap(n) + m - 1) % m
    }

    pub fn add(&self, n: u32, k: u32) -> u32 {
        let m = u64::from(self.modulus);
        ((u64::from(n) % m + u64::from(k) % m) % m) as u32
    }

    /// 从 `from` 向前走到 `to` 需要的步数，范围 `0..modulus`。
    pub fn distance(&self, from: u32, to: u32) -> u32 {
        let m = self.modulus;
        (self.wrap(to) + m - self.wrap(from)) % m
    }

    /// 乱序信道上，滞留的旧副本能否与回绕后的同号帧混淆。
    ///
    /// 副本最多在信道里停留 `max_ms`。记 `n = M / W - 1`：
    /// 发送端最后一次发出某号之后，序号至少要经过 `2n - 1` 个最小单程时延
    /// 才会回绕到能被误收的位置（数据帧与确认号都一样）。
    /// 所以要求 `max_ms < (2n - 1) * min_ms`；时延固定时信道根本不会乱序。
    pub fn tolerates_reorder(&self, window: u32, min_ms: u64, max_ms: u64) -> bool {
        if min_ms == max_ms {
            return true;
        }
        let n = u64::from(self.modulus / window.max(1)).saturating_sub(1);
        if n == 0 {
            return false;
        }
        max_ms < (2 * n - 1).saturating_mul(min_ms)
    }

    /// 循环意义下 `a <= b < c`。`a == c` 表示空区间。
    pub fn between(&self, a: u32, b: u32, c: u32) -> bool {
        self.distance(a, b) < self.distance(a, c)
    }
}
