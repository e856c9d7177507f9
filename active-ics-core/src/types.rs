use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

/// 带时区的绝对时刻
///
/// 相等、排序和哈希只比较绝对时刻，时区决定按日、月、年推算时使用的墙上时间。
pub type Instant = DateTime<Tz>;

/// 重复频率 (RRULE `FREQ`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 重复规则 (RRULE)
///
/// `by_month_day` 只做记录：没有 `by_day` 的按月规则总是重复在首次发生的那一天。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurrenceRule {
    /// 重复频率
    pub frequency: Frequency,
    /// 实例最晚的开始时间 (UNTIL)
    pub until: Option<Instant>,
    /// 最多考虑的实例数 (COUNT)
    pub count: Option<u32>,
    /// 间隔 (INTERVAL)，至少为 1
    pub interval: u32,
    /// BYDAY 值，按周规则如 `MO`，按月规则如 `4FR`
    pub by_day: Vec<String>,
    /// BYMONTHDAY 值
    pub by_month_day: Vec<i32>,
}

impl RecurrenceRule {
    pub const fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            until: None,
            count: None,
            interval: 1,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
        }
    }

    pub fn with_until(mut self, until: Instant) -> Self {
        self.until = Some(until);
        self
    }

    pub const fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub const fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_by_day<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_day = tokens.into_iter().map(Into::into).collect();
        self
    }
}

/// 一条 VEVENT 记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// 标题 (SUMMARY)
    pub name: Option<String>,
    pub start: Instant,
    pub end: Instant,
    pub uid: String,
    /// 被本记录替换的规则实例的原开始时间 (RECURRENCE-ID)
    pub recurrence_id: Option<Instant>,
    /// RRULE，主事件恰好有一条
    pub recurrence_rules: Vec<RecurrenceRule>,
    /// 附加日期 (RDATE)
    pub recurrence_dates: Vec<Instant>,
    /// 排除日期 (EXDATE)
    pub excluding_dates: Vec<Instant>,
}

impl Event {
    /// 创建不重复的单次事件
    pub fn new(name: impl Into<String>, uid: impl Into<String>, start: Instant, end: Instant) -> Self {
        Self {
            name: Some(name.into()),
            start,
            end,
            uid: uid.into(),
            recurrence_id: None,
            recurrence_rules: Vec::new(),
            recurrence_dates: Vec::new(),
            excluding_dates: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence_rules.push(rule);
        self
    }

    pub fn with_recurrence_id(mut self, recurrence_id: Instant) -> Self {
        self.recurrence_id = Some(recurrence_id);
        self
    }

    pub fn with_excluding_dates(mut self, dates: impl IntoIterator<Item = Instant>) -> Self {
        self.excluding_dates.extend(dates);
        self
    }

    pub fn with_recurrence_dates(mut self, dates: impl IntoIterator<Item = Instant>) -> Self {
        self.recurrence_dates.extend(dates);
        self
    }

    /// 是否带有重复规则
    pub fn has_rule(&self) -> bool {
        !self.recurrence_rules.is_empty()
    }

    /// 实例的绝对时长
    pub fn duration(&self) -> chrono::Duration {
        self.end.signed_duration_since(self.start)
    }
}

/// 解析后的日历
#[derive(Debug, Clone, Serialize)]
pub struct Calendar {
    /// 日历声明的时区 (VTIMEZONE / X-WR-TIMEZONE)，没有时为默认时区
    pub timezone: Tz,
    pub events: Vec<Event>,
}

/// 日历读取选项
#[derive(Debug, Clone)]
pub struct CalendarOptions {
    /// 日历未声明时区时使用的默认时区
    pub default_timezone: Tz,
}

impl Default for CalendarOptions {
    fn default() -> Self {
        Self {
            default_timezone: Tz::UTC,
        }
    }
}
