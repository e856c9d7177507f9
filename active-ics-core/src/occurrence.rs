use serde::Serialize;

use crate::Instant;

/// `query` 是否落在半开区间 `[start, end)` 内
///
/// 首尾相接的两个实例共享边界时刻，只有后一个包含它。
pub fn is_active(query: &Instant, start: &Instant, end: &Instant) -> bool {
    start <= query && query < end
}

/// 事件的一个具体实例 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Occurrence {
    pub start: Instant,
    pub end: Instant,
}

impl Occurrence {
    pub const fn new(start: Instant, end: Instant) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, query: &Instant) -> bool {
        is_active(query, &self.start, &self.end)
    }
}
