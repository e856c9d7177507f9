use std::{str::FromStr, sync::LazyLock};

use chrono::{Datelike, Weekday};
use regex::Regex;

use crate::{Error, Instant, Result, rrule, zoned};

static NTH_WEEKDAY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)([A-Z]{2})$").expect("valid BYDAY token pattern"));

/// 按月 BYDAY 值，如 `4FR`（当月第四个星期五）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NthWeekday {
    pub ordinal: u32,
    pub weekday: Weekday,
}

impl FromStr for NthWeekday {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            Error::InvalidRuleFormat(format!("BYDAY token '{}': {}", token, reason))
        };

        let captures = NTH_WEEKDAY_TOKEN
            .captures(token)
            .ok_or_else(|| invalid("expected <n><day code>"))?;

        let ordinal = captures[1]
            .parse::<u32>()
            .map_err(|_| invalid("ordinal out of range"))?;
        if ordinal == 0 {
            return Err(invalid("ordinal must be at least 1"));
        }

        let weekday = rrule::weekday_from_code(&captures[2])
            .ok_or_else(|| invalid("unknown day code"))?;

        Ok(Self { ordinal, weekday })
    }
}

impl NthWeekday {
    /// 在 `month_anchor` 所在月份中求解，保留其墙上时间
    ///
    /// 从当月一日找到第一个匹配的星期几，再往后推 `ordinal - 1` 周。
    /// 序号超出当月时会落到下个月。
    pub fn resolve(&self, month_anchor: &Instant) -> Option<Instant> {
        let first = zoned::beginning_of_month(month_anchor)?;
        let first_match = if first.weekday() == self.weekday {
            first
        } else {
            zoned::next_weekday(&first, self.weekday)?
        };
        zoned::add_weeks(&first_match, u64::from(self.ordinal - 1))
    }
}

/// `month_anchor` 所在月份的第 n 个星期几（如 `2TU`）
pub fn nth_weekday_of_month(month_anchor: &Instant, token: &str) -> Result<Instant> {
    token.parse::<NthWeekday>()?.resolve(month_anchor).ok_or_else(|| {
        Error::Internal(format!(
            "date out of range resolving '{}' from {}",
            token, month_anchor
        ))
    })
}
