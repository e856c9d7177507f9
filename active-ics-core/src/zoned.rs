//! 带时区时刻的墙上时间运算
//!
//! 日、月、年在时刻所在时区的本地时间上推算，再映射回绝对时刻，
//! 因此 10:00 的会议在夏令时切换前后都在 10:00。
//! 重复出现的本地时间取较早的时刻，夏令时跳过的本地时间顺延一小时。

use chrono::{Datelike, Days, LocalResult, Months, NaiveDateTime, TimeZone, Weekday};
use chrono_tz::Tz;

use crate::{Error, Instant, Result};

/// 将 `tz` 中的本地时间映射为绝对时刻
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<Instant> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(local + chrono::Duration::hours(1)))
            .earliest(),
    }
}

fn shift_local<F>(instant: &Instant, shift: F) -> Option<Instant>
where
    F: FnOnce(NaiveDateTime) -> Option<NaiveDateTime>,
{
    let local = shift(instant.naive_local())?;
    resolve_local(instant.timezone(), local)
}

pub fn add_days(instant: &Instant, days: u64) -> Option<Instant> {
    shift_local(instant, |local| local.checked_add_days(Days::new(days)))
}

pub fn sub_days(instant: &Instant, days: u64) -> Option<Instant> {
    shift_local(instant, |local| local.checked_sub_days(Days::new(days)))
}

pub fn add_weeks(instant: &Instant, weeks: u64) -> Option<Instant> {
    add_days(instant, weeks.checked_mul(7)?)
}

/// 增加月份，日期超出目标月份天数时取月末
pub fn add_months(instant: &Instant, months: u32) -> Option<Instant> {
    shift_local(instant, |local| local.checked_add_months(Months::new(months)))
}

pub fn add_years(instant: &Instant, years: u32) -> Option<Instant> {
    add_months(instant, years.checked_mul(12)?)
}

/// 所在月份的第一天，墙上时间不变
pub fn beginning_of_month(instant: &Instant) -> Option<Instant> {
    shift_local(instant, |local| local.with_day(1))
}

/// 当天或之前最近的指定星期几，墙上时间不变
pub fn previous_or_same(instant: &Instant, weekday: Weekday) -> Option<Instant> {
    let current = instant.weekday().num_days_from_monday();
    let target = weekday.num_days_from_monday();
    let back = (current + 7 - target) % 7;
    sub_days(instant, u64::from(back))
}

/// 之后（不含当天）最近的指定星期几，墙上时间不变
pub fn next_weekday(instant: &Instant, weekday: Weekday) -> Option<Instant> {
    let current = instant.weekday().num_days_from_monday();
    let target = weekday.num_days_from_monday();
    let ahead = match (target + 7 - current) % 7 {
        0 => 7,
        n => n,
    };
    add_days(instant, u64::from(ahead))
}

/// 解析查询时刻
///
/// RFC 3339 格式保留绝对时刻并转换到 `tz` 显示；
/// `YYYY-MM-DD HH:MM[:SS]`（或用 `T` 分隔）视为 `tz` 中的墙上时间。
pub fn parse_instant(value: &str, tz: Tz) -> Result<Instant> {
    let value = value.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&tz));
    }

    const LOCAL_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .and_then(|local| resolve_local(tz, local))
        .ok_or_else(|| Error::Config(format!("invalid instant '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use chrono_tz::Europe::London;

    fn london(y: i32, m: u32, d: u32, h: u32, min: u32) -> Instant {
        let local = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap();
        resolve_local(London, local).unwrap()
    }

    #[test]
    fn add_days_keeps_wall_clock_across_dst() {
        let before = london(2022, 3, 26, 10, 0);
        let after = add_days(&before, 1).unwrap();
        assert_eq!(after.hour(), 10);
        assert_eq!(after.day(), 27);
        // the spring-forward day is only 23 hours long
        assert_eq!(after.signed_duration_since(before).num_hours(), 23);
    }

    #[test]
    fn ambiguous_local_time_resolves_to_earliest() {
        let fold = london(2022, 10, 30, 1, 30);
        assert_eq!(fold.to_rfc3339(), "2022-10-30T01:30:00+01:00");
    }

    #[test]
    fn nonexistent_local_time_moves_forward() {
        let gap = london(2022, 3, 27, 1, 30);
        assert_eq!(gap.to_rfc3339(), "2022-03-27T02:30:00+01:00");
    }

    #[test]
    fn add_months_clamps_day() {
        let jan31 = london(2022, 1, 31, 9, 0);
        let feb = add_months(&jan31, 1).unwrap();
        assert_eq!((feb.month(), feb.day(), feb.hour()), (2, 28, 9));
        let mar = add_months(&jan31, 2).unwrap();
        assert_eq!((mar.month(), mar.day()), (3, 31));
    }

    #[test]
    fn add_years_handles_leap_day() {
        let leap = london(2024, 2, 29, 12, 0);
        let next = add_years(&leap, 1).unwrap();
        assert_eq!((next.year(), next.month(), next.day()), (2025, 2, 28));
    }

    #[test]
    fn weekday_navigation() {
        let wednesday = london(2022, 3, 16, 10, 0);
        let monday = previous_or_same(&wednesday, Weekday::Mon).unwrap();
        assert_eq!((monday.day(), monday.hour()), (14, 10));
        assert_eq!(previous_or_same(&monday, Weekday::Mon).unwrap(), monday);

        let friday = next_weekday(&wednesday, Weekday::Fri).unwrap();
        assert_eq!(friday.day(), 18);
        let next_wednesday = next_weekday(&wednesday, Weekday::Wed).unwrap();
        assert_eq!(next_wednesday.day(), 23);
    }

    #[test]
    fn beginning_of_month_keeps_time() {
        let mid = london(2022, 11, 17, 18, 45);
        let first = beginning_of_month(&mid).unwrap();
        assert_eq!((first.day(), first.hour(), first.minute()), (1, 18, 45));
    }

    #[test]
    fn parses_query_instants() {
        let utc = parse_instant("2022-10-30T01:30:00Z", London).unwrap();
        assert_eq!(utc.to_rfc3339(), "2022-10-30T01:30:00+00:00");
        assert_eq!(utc.timezone(), London);

        assert_eq!(
            parse_instant("2022-03-16 10:00", London).unwrap(),
            london(2022, 3, 16, 10, 0)
        );
        assert_eq!(
            parse_instant("2022-03-16T10:00:00", London).unwrap(),
            london(2022, 3, 16, 10, 0)
        );
        assert!(matches!(
            parse_instant("next tuesday", London),
            Err(Error::Config(_))
        ));
    }
}
