use std::collections::{BTreeMap, HashSet};

use crate::{Error, Event, Instant, RecurrenceRule, Result};

/// 同一 UID 下的全部事件
#[derive(Debug, Clone)]
pub enum EventFamily<'a> {
    /// 没有规则也没有附加日期，每个成员各自独立
    Simple(Vec<&'a Event>),
    /// 一个带规则的主事件及其覆盖实例
    Recurring(RecurringFamily<'a>),
}

/// 带规则的主事件及覆盖其实例的记录
#[derive(Debug, Clone)]
pub struct RecurringFamily<'a> {
    pub uid: &'a str,
    pub master: &'a Event,
    pub rule: &'a RecurrenceRule,
    /// 所有非主事件成员，无论是否带有 RECURRENCE-ID
    pub overrides: Vec<&'a Event>,
    /// 被覆盖实例的原开始时间 (RECURRENCE-ID)
    pub overridden: HashSet<Instant>,
    /// 被 EXDATE 排除的开始时间
    pub excluded: HashSet<Instant>,
}

impl<'a> RecurringFamily<'a> {
    fn new(uid: &'a str, master: &'a Event, rule: &'a RecurrenceRule, members: &[&'a Event]) -> Self {
        let overrides: Vec<&Event> = members
            .iter()
            .copied()
            .filter(|e| !std::ptr::eq(*e, master))
            .collect();
        let overridden = overrides.iter().filter_map(|e| e.recurrence_id).collect();
        let excluded = master.excluding_dates.iter().copied().collect();

        Self {
            uid,
            master,
            rule,
            overrides,
            overridden,
            excluded,
        }
    }

    /// 从 `start` 开始的规则实例是否被覆盖或排除
    pub fn is_suppressed(&self, start: &Instant) -> bool {
        self.excluded.contains(start) || self.overridden.contains(start)
    }
}

/// 按 UID 分组并区分各组类型
///
/// 带规则或附加日期的成员定义重复。一组中有多个这样的成员或该成员带有多条规则时
/// 返回 [`Error::AmbiguousRecurrenceDefinition`]；只有附加日期没有规则时返回
/// [`Error::UnsupportedRdateOnlyRecurrence`]。
pub fn group_events(events: &[Event]) -> Result<Vec<EventFamily<'_>>> {
    let mut by_uid: BTreeMap<&str, Vec<&Event>> = BTreeMap::new();
    for event in events {
        by_uid.entry(event.uid.as_str()).or_default().push(event);
    }

    by_uid
        .into_iter()
        .map(|(uid, members)| classify(uid, members))
        .collect()
}

fn classify<'a>(uid: &'a str, members: Vec<&'a Event>) -> Result<EventFamily<'a>> {
    let definitions: Vec<&Event> = members
        .iter()
        .copied()
        .filter(|e| e.has_rule() || !e.recurrence_dates.is_empty())
        .collect();

    let master = match definitions.as_slice() {
        [] => {
            tracing::debug!("UID {} is a simple family of {} event(s)", uid, members.len());
            return Ok(EventFamily::Simple(members));
        }
        [master] => *master,
        _ => {
            return Err(Error::AmbiguousRecurrenceDefinition {
                uid: uid.to_string(),
                reason: format!("{} events define the recurrence", definitions.len()),
            });
        }
    };

    let rule = match master.recurrence_rules.as_slice() {
        [rule] => rule,
        [] => return Err(Error::UnsupportedRdateOnlyRecurrence(uid.to_string())),
        rules => {
            return Err(Error::AmbiguousRecurrenceDefinition {
                uid: uid.to_string(),
                reason: format!("{} recurrence rules on one event", rules.len()),
            });
        }
    };

    let family = RecurringFamily::new(uid, master, rule, &members);
    tracing::debug!(
        "UID {} recurs {} with {} override(s), {} exclusion(s)",
        uid,
        rule,
        family.overrides.len(),
        family.excluded.len()
    );
    Ok(EventFamily::Recurring(family))
}
