//! RRULE 的解析与输出

use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Weekday};
use chrono_tz::Tz;

use crate::{Error, Frequency, Instant, RecurrenceRule, Result, zoned};

/// 不支持的 RRULE 部分，遇到时直接报错
const UNSUPPORTED_PARTS: [&str; 7] = [
    "BYSECOND", "BYMINUTE", "BYHOUR", "BYYEARDAY", "BYWEEKNO", "BYMONTH", "BYSETPOS",
];

/// 两字母星期代码转换为星期几
pub fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            _ => Err(Error::UnsupportedFrequency(s.to_string())),
        }
    }
}

impl RecurrenceRule {
    /// 解析 RRULE 值，如 `FREQ=WEEKLY;COUNT=25;BYDAY=MO,WE`
    ///
    /// 浮动时间和纯日期的 `UNTIL` 在 `tz` 中解析。
    pub fn parse(value: &str, tz: Tz) -> Result<Self> {
        let mut frequency = None;
        let mut until = None;
        let mut count = None;
        let mut interval = 1;
        let mut by_day = Vec::new();
        let mut by_month_day = Vec::new();

        for part in value.trim().trim_start_matches("RRULE:").split(';') {
            if part.is_empty() {
                continue;
            }
            let (key, val) = part
                .split_once('=')
                .ok_or_else(|| Error::InvalidRuleFormat(format!("malformed part '{}'", part)))?;
            let key = key.to_ascii_uppercase();

            match key.as_str() {
                "FREQ" => frequency = Some(val.parse::<Frequency>()?),
                "UNTIL" => until = Some(parse_until(val, tz)?),
                "COUNT" => count = Some(parse_number::<u32>(&key, val)?),
                "INTERVAL" => {
                    interval = parse_number::<u32>(&key, val)?;
                    if interval == 0 {
                        return Err(Error::InvalidRuleFormat(
                            "INTERVAL must be at least 1".to_string(),
                        ));
                    }
                }
                "BYDAY" => by_day = val.split(',').map(|d| d.trim().to_ascii_uppercase()).collect(),
                "BYMONTHDAY" => {
                    by_month_day = val
                        .split(',')
                        .map(|d| parse_number::<i32>(&key, d.trim()))
                        .collect::<Result<_>>()?;
                }
                "WKST" => tracing::debug!("Ignoring WKST={}, weeks start on Monday", val),
                k if UNSUPPORTED_PARTS.contains(&k) => {
                    return Err(Error::UnsupportedRulePart(part.to_string()));
                }
                _ => {
                    return Err(Error::InvalidRuleFormat(format!(
                        "unknown rule part '{}'",
                        part
                    )));
                }
            }
        }

        let frequency = frequency
            .ok_or_else(|| Error::InvalidRuleFormat(format!("missing FREQ in '{}'", value)))?;

        Ok(Self {
            frequency,
            until,
            count,
            interval,
            by_day,
            by_month_day,
        })
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency)?;
        if self.interval > 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if let Some(until) = self.until {
            write!(
                f,
                ";UNTIL={}",
                until.with_timezone(&chrono::Utc).format("%Y%m%dT%H%M%SZ")
            )?;
        }
        if let Some(count) = self.count {
            write!(f, ";COUNT={}", count)?;
        }
        if !self.by_day.is_empty() {
            write!(f, ";BYDAY={}", self.by_day.join(","))?;
        }
        if !self.by_month_day.is_empty() {
            let days: Vec<String> = self.by_month_day.iter().map(ToString::to_string).collect();
            write!(f, ";BYMONTHDAY={}", days.join(","))?;
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| Error::InvalidRuleFormat(format!("invalid {} value '{}'", key, value)))
}

fn parse_until(value: &str, tz: Tz) -> Result<Instant> {
    let invalid = || Error::InvalidRuleFormat(format!("invalid UNTIL value '{}'", value));

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
        return Ok(Tz::UTC.from_utc_datetime(&naive).with_timezone(&tz));
    }

    let naive = match NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") {
        Ok(naive) => naive,
        Err(_) => NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|_| invalid())?
            .and_time(chrono::NaiveTime::MIN),
    };

    zoned::resolve_local(tz, naive).ok_or_else(invalid)
}
