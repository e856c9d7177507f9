//! 按频率展开重复实例
//!
//! [`Occurrences`] 从首次实例开始逐步生成候选实例，超过 `UNTIL` 或已考虑 `COUNT`
//! 个候选后停止。无界规则不会自行结束，由调用方在查询时刻处停止。
//!
//! 每个候选都直接由首次实例推算（第 k 个按日候选为首次实例加 `k * interval` 天），
//! 月末截断和夏令时顺延不会逐步累积。按月 BYDAY 规则例外：每个候选在上一个候选所在
//! 月份之后 `interval` 个月内求解，因此溢出到下个月的 `5MO` 会把该月份带到后续实例。

use std::iter::FusedIterator;

use chrono::{Datelike, Weekday};

use crate::{
    Error, Frequency, Instant, RecurrenceRule, Result, nth_weekday::NthWeekday,
    occurrence::Occurrence, rrule, zoned,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Days,
    Weeks,
    Months,
    Years,
}

impl Unit {
    fn shift(self, instant: &Instant, amount: u64) -> Option<Instant> {
        match self {
            Self::Days => zoned::add_days(instant, amount),
            Self::Weeks => zoned::add_weeks(instant, amount),
            Self::Months => zoned::add_months(instant, u32::try_from(amount).ok()?),
            Self::Years => zoned::add_years(instant, u32::try_from(amount).ok()?),
        }
    }
}

#[derive(Debug, Clone)]
enum Cadence {
    /// 每 `interval` 个单位一个候选
    Every { unit: Unit, step: u64 },
    /// 每隔 `interval` 周（周一起算）中列出的星期几
    WeeklyByDay {
        days: Vec<Weekday>,
        week: u64,
        day: u64,
    },
    /// 上一个候选所在月份之后 `interval` 个月的第 n 个星期几
    MonthlyByDay {
        nth: NthWeekday,
        previous: Option<Instant>,
    },
}

/// 一条重复规则按需展开的候选实例
#[derive(Debug, Clone)]
pub struct Occurrences {
    anchor: Occurrence,
    interval: u64,
    until: Option<Instant>,
    count: Option<u32>,
    considered: u32,
    cadence: Cadence,
    finished: bool,
}

impl Occurrences {
    /// 以主事件的实例为起点创建展开器
    ///
    /// 间隔为 0、按周 BYDAY 不是星期代码、按月 BYDAY 不是 `<n><星期代码>` 时
    /// 返回 [`Error::InvalidRuleFormat`]。
    pub fn new(rule: &RecurrenceRule, anchor: Occurrence) -> Result<Self> {
        if rule.interval == 0 {
            return Err(Error::InvalidRuleFormat(
                "INTERVAL must be at least 1".to_string(),
            ));
        }

        let cadence = match rule.frequency {
            Frequency::Daily => Cadence::Every {
                unit: Unit::Days,
                step: 0,
            },
            Frequency::Weekly if rule.by_day.is_empty() => Cadence::Every {
                unit: Unit::Weeks,
                step: 0,
            },
            Frequency::Weekly => Cadence::WeeklyByDay {
                days: weekly_days(&rule.by_day)?,
                week: 0,
                day: 0,
            },
            Frequency::Monthly => match rule.by_day.first() {
                None => {
                    if !rule.by_month_day.is_empty() {
                        tracing::debug!(
                            "BYMONTHDAY={:?} approximated by the anchor day {}",
                            rule.by_month_day,
                            anchor.start.day()
                        );
                    }
                    Cadence::Every {
                        unit: Unit::Months,
                        step: 0,
                    }
                }
                Some(token) => {
                    if rule.by_day.len() > 1 {
                        tracing::debug!("Only the first monthly BYDAY entry ({}) is used", token);
                    }
                    Cadence::MonthlyByDay {
                        nth: token.parse()?,
                        previous: None,
                    }
                }
            },
            Frequency::Yearly => Cadence::Every {
                unit: Unit::Years,
                step: 0,
            },
        };

        Ok(Self {
            anchor,
            interval: u64::from(rule.interval),
            until: rule.until,
            count: rule.count,
            considered: 0,
            cadence,
            finished: false,
        })
    }

    fn next_candidate(&mut self) -> Option<Occurrence> {
        let anchor = self.anchor;
        let interval = self.interval;

        match &mut self.cadence {
            Cadence::Every { unit, step } => {
                let amount = step.checked_mul(interval)?;
                *step += 1;
                if amount == 0 {
                    return Some(anchor);
                }
                Some(Occurrence::new(
                    unit.shift(&anchor.start, amount)?,
                    unit.shift(&anchor.end, amount)?,
                ))
            }
            Cadence::MonthlyByDay { nth, previous } => {
                let Some(last) = previous else {
                    *previous = Some(anchor.start);
                    return Some(anchor);
                };
                let month_start = zoned::beginning_of_month(last)?;
                let month = Unit::Months.shift(&month_start, interval)?;
                let start = nth.resolve(&month)?;
                *previous = Some(start);
                let end = start.checked_add_signed(anchor.end.signed_duration_since(anchor.start))?;
                Some(Occurrence::new(start, end))
            }
            Cadence::WeeklyByDay { days, week, day } => loop {
                if *day == 7 {
                    *day = 0;
                    *week += 1;
                }
                let offset = *day;
                *day += 1;

                let week_anchor = zoned::add_weeks(&anchor.start, week.checked_mul(interval)?)?;
                let monday = zoned::previous_or_same(&week_anchor, Weekday::Mon)?;
                let start = zoned::add_days(&monday, offset)?;
                if start < anchor.start || !days.contains(&start.weekday()) {
                    continue;
                }

                let monday_end =
                    monday.checked_add_signed(anchor.end.signed_duration_since(anchor.start))?;
                let end = zoned::add_days(&monday_end, offset)?;
                return Some(Occurrence::new(start, end));
            },
        }
    }
}

impl Iterator for Occurrences {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if self.finished {
            return None;
        }
        if self.count.is_some_and(|count| self.considered >= count) {
            self.finished = true;
            return None;
        }

        let candidate = match self.next_candidate() {
            Some(candidate) if self.until.is_none_or(|until| candidate.start <= until) => candidate,
            _ => {
                self.finished = true;
                return None;
            }
        };

        self.considered += 1;
        Some(candidate)
    }
}

impl FusedIterator for Occurrences {}

fn weekly_days(tokens: &[String]) -> Result<Vec<Weekday>> {
    tokens
        .iter()
        .map(|token| {
            rrule::weekday_from_code(token).ok_or_else(|| {
                Error::InvalidRuleFormat(format!("weekly BYDAY entry '{}' is not a day code", token))
            })
        })
        .collect()
}
