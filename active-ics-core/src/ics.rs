use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    str::FromStr,
};

use chrono::{NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use ical::{
    parser::ical::{
        IcalParser,
        component::{IcalCalendar, IcalEvent},
    },
    property::Property,
};
use uuid::Uuid;

use crate::{Calendar, CalendarOptions, Error, Event, Instant, RecurrenceRule, Result, zoned};

/// ICS日历读取器
///
/// 将 VCALENDAR 文本解析为带时区的 [`Event`] 记录。
pub struct CalendarReader {
    options: CalendarOptions,
}

impl CalendarReader {
    pub fn new(options: CalendarOptions) -> Self {
        Self { options }
    }

    /// 从文件路径读取ICS
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> Result<Calendar> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref).map_err(|err| {
            Error::Ics(format!(
                "cannot open calendar file {}: {}",
                path_ref.display(),
                err
            ))
        })?;
        self.read(file)
    }

    /// 从字节切片读取ICS
    pub fn read_bytes(&self, bytes: impl AsRef<[u8]>) -> Result<Calendar> {
        self.read(std::io::Cursor::new(bytes.as_ref()))
    }

    /// 从读取器中读取ICS
    ///
    /// 收集流中所有 VCALENDAR 的事件，返回第一个日历的时区。
    pub fn read<R: Read>(&self, reader: R) -> Result<Calendar> {
        let parser = IcalParser::new(BufReader::new(reader));
        let mut timezone = None;
        let mut events = Vec::new();

        for calendar in parser {
            let calendar = calendar.map_err(|err| Error::Ics(err.to_string()))?;
            let calendar_tz = self.calendar_timezone(&calendar);
            timezone.get_or_insert(calendar_tz);

            for event in &calendar.events {
                events.push(read_event(event, calendar_tz)?);
            }
        }

        let timezone =
            timezone.ok_or_else(|| Error::Ics("no VCALENDAR component found".to_string()))?;
        tracing::debug!("Read {} event(s), calendar timezone {}", events.len(), timezone);

        Ok(Calendar { timezone, events })
    }

    /// 依次使用 VTIMEZONE、`X-WR-TIMEZONE` 和默认时区
    fn calendar_timezone(&self, calendar: &IcalCalendar) -> Tz {
        let declared = calendar
            .timezones
            .iter()
            .find_map(|tz| property_value(&tz.properties, "TZID"))
            .or_else(|| property_value(&calendar.properties, "X-WR-TIMEZONE"));

        let Some(name) = declared else {
            return self.options.default_timezone;
        };

        resolve_tzid(name).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown calendar timezone '{}', using {}",
                name,
                self.options.default_timezone
            );
            self.options.default_timezone
        })
    }
}

impl Default for CalendarReader {
    fn default() -> Self {
        Self::new(CalendarOptions::default())
    }
}

/// 将 TZID 解析为 IANA 时区
///
/// 带厂商前缀的标识（如 `/mozilla.org/20050126_1/Europe/London`）按末尾的 IANA 名称解析。
pub fn resolve_tzid(tzid: &str) -> Option<Tz> {
    let tzid = tzid.trim().trim_matches('"');
    if let Ok(tz) = Tz::from_str(tzid) {
        return Some(tz);
    }

    tzid.match_indices('/')
        .find_map(|(idx, _)| Tz::from_str(&tzid[idx + 1..]).ok())
}

/// 解析后的 DATE 或 DATE-TIME 值
#[derive(Debug, Clone, Copy)]
struct DateValue {
    instant: Instant,
    all_day: bool,
}

fn read_event(event: &IcalEvent, calendar_tz: Tz) -> Result<Event> {
    let props = &event.properties;

    let uid = property_value(props, "UID")
        .map(str::to_string)
        .unwrap_or_else(|| {
            let generated = Uuid::new_v4().to_string();
            tracing::debug!("Event without UID, using {}", generated);
            generated
        });

    let start_prop = find_property(props, "DTSTART")
        .ok_or_else(|| Error::Ics(format!("event {} has no DTSTART", uid)))?;
    let start = single_date_value(start_prop, calendar_tz)?;

    let end = match find_property(props, "DTEND") {
        Some(prop) => single_date_value(prop, calendar_tz)?.instant,
        None if start.all_day => zoned::add_days(&start.instant, 1)
            .ok_or_else(|| Error::Ics(format!("event {} ends out of range", uid)))?,
        None => start.instant,
    };

    let recurrence_id = find_property(props, "RECURRENCE-ID")
        .map(|prop| single_date_value(prop, calendar_tz))
        .transpose()?
        .map(|value| value.instant);

    let rule_tz = start.instant.timezone();
    let recurrence_rules = properties(props, "RRULE")
        .filter_map(|prop| prop.value.as_deref())
        .map(|value| RecurrenceRule::parse(value, rule_tz))
        .collect::<Result<Vec<_>>>()?;

    Ok(Event {
        name: property_value(props, "SUMMARY").map(unescape_text),
        start: start.instant,
        end,
        uid,
        recurrence_id,
        recurrence_rules,
        recurrence_dates: date_list(props, "RDATE", calendar_tz)?,
        excluding_dates: date_list(props, "EXDATE", calendar_tz)?,
    })
}

fn single_date_value(prop: &Property, calendar_tz: Tz) -> Result<DateValue> {
    date_values(prop, calendar_tz)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Ics(format!("{} has no value", prop.name)))
}

fn date_list(props: &[Property], name: &str, calendar_tz: Tz) -> Result<Vec<Instant>> {
    let mut instants = Vec::new();
    for prop in properties(props, name) {
        instants.extend(date_values(prop, calendar_tz)?.into_iter().map(|v| v.instant));
    }
    Ok(instants)
}

/// 解析日期属性中逗号分隔的每个值
///
/// DATE 为日历时区的零点；UTC 值保持 UTC，以其为起点的规则按 UTC 推算；
/// 浮动时间属于其 TZID（没有时为日历时区）。
fn date_values(prop: &Property, calendar_tz: Tz) -> Result<Vec<DateValue>> {
    let is_date = parameter(prop, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
    let local_tz = match parameter(prop, "TZID") {
        Some(tzid) => resolve_tzid(tzid).unwrap_or_else(|| {
            tracing::warn!("Unknown TZID '{}' on {}, using {}", tzid, prop.name, calendar_tz);
            calendar_tz
        }),
        None => calendar_tz,
    };

    let Some(raw) = prop.value.as_deref() else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|value| {
            // PERIOD 只取开始时间
            let value = value.split('/').next().unwrap_or(value);
            parse_date_value(value, is_date, local_tz, calendar_tz).ok_or_else(|| {
                Error::Ics(format!("invalid {} value '{}'", prop.name, value))
            })
        })
        .collect()
}

fn parse_date_value(value: &str, is_date: bool, local_tz: Tz, calendar_tz: Tz) -> Option<DateValue> {
    if is_date || value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        let instant = zoned::resolve_local(calendar_tz, date.and_time(chrono::NaiveTime::MIN))?;
        return Some(DateValue {
            instant,
            all_day: true,
        });
    }

    let instant = match value.strip_suffix('Z') {
        Some(utc) => {
            let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").ok()?;
            Tz::UTC.from_utc_datetime(&naive)
        }
        None => {
            let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
            zoned::resolve_local(local_tz, naive)?
        }
    };

    Some(DateValue {
        instant,
        all_day: false,
    })
}

fn find_property<'a>(props: &'a [Property], name: &str) -> Option<&'a Property> {
    props.iter().find(|prop| prop.name.eq_ignore_ascii_case(name))
}

fn properties<'a>(props: &'a [Property], name: &'a str) -> impl Iterator<Item = &'a Property> {
    props
        .iter()
        .filter(move |prop| prop.name.eq_ignore_ascii_case(name))
}

fn property_value<'a>(props: &'a [Property], name: &str) -> Option<&'a str> {
    find_property(props, name).and_then(|prop| prop.value.as_deref())
}

fn parameter<'a>(prop: &'a Property, name: &str) -> Option<&'a str> {
    prop.params
        .as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}

/// 反转义ICS文本内容
fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
