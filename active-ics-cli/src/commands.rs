use active_ics_core::{
    ActiveEventEvaluator, Calendar, CalendarOptions,
    family::{EventFamily, group_events},
    ics::resolve_tzid,
    source::{CalendarLoader, CalendarSource},
    zoned,
};
use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;

use crate::OutputFormat;

/// 查询活动事件命令参数
pub struct ActiveParams {
    pub source: String,
    pub at: Option<String>,
    pub timezone: Option<String>,
    pub default_timezone: Option<String>,
    pub format: OutputFormat,
}

/// 查询活动事件命令
pub async fn active_command(params: ActiveParams) -> Result<()> {
    let calendar = load_calendar(&params.source, params.default_timezone.as_deref()).await?;

    let tz = match params.timezone.as_deref() {
        Some(name) => parse_timezone(name)?,
        None => calendar.timezone,
    };
    let at = match params.at.as_deref() {
        Some(value) => zoned::parse_instant(value, tz)?,
        None => Utc::now().with_timezone(&tz),
    };

    tracing::info!(
        "查询 {} 在 {} 的活动事件 ({} 个事件)",
        params.source,
        at.to_rfc3339(),
        calendar.events.len()
    );

    let active = ActiveEventEvaluator::new().active_events(&at, &calendar.events)?;

    match params.format {
        OutputFormat::Text => {
            if active.is_empty() {
                tracing::info!("没有正在进行的事件");
            }
            for name in &active {
                println!("{}", name);
            }
        }
        OutputFormat::Json => {
            let body = serde_json::json!({
                "at": at.to_rfc3339(),
                "active": active,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

/// 查看日历结构命令
pub async fn inspect_command(source: String, default_timezone: Option<String>) -> Result<()> {
    let calendar = load_calendar(&source, default_timezone.as_deref()).await?;

    println!("日历: {}", source);
    println!("时区: {}", calendar.timezone);
    println!("事件数: {}", calendar.events.len());

    let families = group_events(&calendar.events)?;
    println!("事件组: {}", families.len());

    for family in families {
        match family {
            EventFamily::Simple(members) => {
                let uid = members.first().map_or("", |e| e.uid.as_str());
                println!("  {} [simple] {} 个事件", uid, members.len());
                for event in members {
                    println!(
                        "    {} {} - {}",
                        event.name.as_deref().unwrap_or("(未命名)"),
                        event.start.to_rfc3339(),
                        event.end.to_rfc3339()
                    );
                }
            }
            EventFamily::Recurring(family) => {
                println!(
                    "  {} [recurring] {}",
                    family.uid,
                    family.master.name.as_deref().unwrap_or("(未命名)")
                );
                println!("    首次: {}", family.master.start.to_rfc3339());
                println!("    规则: {}", family.rule);
                println!(
                    "    覆盖: {}, 附加日期: {}, 排除日期: {}",
                    family.overrides.len(),
                    family.master.recurrence_dates.len(),
                    family.excluded.len()
                );
            }
        }
    }

    Ok(())
}

async fn load_calendar(source: &str, default_timezone: Option<&str>) -> Result<Calendar> {
    let default_timezone = match default_timezone
        .map(str::to_string)
        .or_else(|| std::env::var("DEFAULT_TIMEZONE").ok())
    {
        Some(name) => parse_timezone(&name)?,
        None => Tz::UTC,
    };

    let source: CalendarSource = source.parse()?;
    let loader = CalendarLoader::new(CalendarOptions { default_timezone })?;
    let calendar = loader
        .load(&source)
        .await
        .with_context(|| format!("无法读取日历 {}", source))?;

    Ok(calendar)
}

fn parse_timezone(name: &str) -> Result<Tz> {
    resolve_tzid(name).ok_or_else(|| anyhow::anyhow!("未知的时区: {}", name))
}
