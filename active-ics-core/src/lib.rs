//! Active ICS 核心库
//!
//! 回答一个问题：某个 iCalendar 日历在给定时刻有哪些事件正在进行。
//! 读取 VCALENDAR 数据，在日历时区内展开支持的重复规则，并处理排除日期和被覆盖的实例。

pub mod cache;
pub mod error;
pub mod evaluator;
pub mod family;
pub mod ics;
pub mod nth_weekday;
pub mod occurrence;
pub mod rrule;
pub mod source;
pub mod stepper;
pub mod types;
pub mod zoned;

// 重新导出核心类型和错误处理
pub use error::{Error, Result};
pub use evaluator::ActiveEventEvaluator;
pub use types::*;

/// 常用导出
pub mod prelude {
    pub use crate::{
        cache::*, evaluator::*, ics::*, occurrence::*, source::*, types::*, Error, Result,
    };
}
