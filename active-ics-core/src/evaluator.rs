use std::collections::BTreeSet;

use crate::{
    Error, Event, Instant, Result,
    family::{EventFamily, RecurringFamily, group_events},
    occurrence::{Occurrence, is_active},
    stepper::Occurrences,
};

/// 判断日历中哪些事件在某一时刻正在进行
///
/// 无状态，每次调用都重新分组、展开事件，不修改输入。
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveEventEvaluator;

impl ActiveEventEvaluator {
    pub const fn new() -> Self {
        Self
    }

    /// `query` 时刻所有正在进行的事件名称
    ///
    /// 不同事件组的同名事件只保留一个，没有名称的事件不计入。
    /// 任何重复规则错误都会中止整个计算。
    pub fn active_events(&self, query: &Instant, events: &[Event]) -> Result<BTreeSet<String>> {
        let mut active = BTreeSet::new();

        for family in group_events(events)? {
            match family {
                EventFamily::Simple(members) => {
                    active.extend(
                        members
                            .into_iter()
                            .filter(|e| is_active(query, &e.start, &e.end))
                            .filter_map(|e| e.name.clone()),
                    );
                }
                EventFamily::Recurring(family) => {
                    if let Some(name) = self.active_name_for(query, &family)? {
                        active.insert(name.to_string());
                    }
                }
            }
        }

        active.retain(|name| !name.is_empty());
        tracing::debug!("{} active event(s) at {}", active.len(), query);
        Ok(active)
    }

    /// `family` 在 `query` 时刻正在进行的实例名称
    ///
    /// 覆盖实例优先，其次是未被覆盖的附加日期，最后是展开的规则。
    pub fn active_name_for<'a>(
        &self,
        query: &Instant,
        family: &RecurringFamily<'a>,
    ) -> Result<Option<&'a str>> {
        let master = family.master;

        if let Some(replacement) = family
            .overrides
            .iter()
            .copied()
            .find(|e| is_active(query, &e.start, &e.end))
        {
            tracing::debug!("UID {} active through an override", family.uid);
            return Ok(replacement.name.as_deref());
        }

        let duration = master.duration();
        for rdate in master
            .recurrence_dates
            .iter()
            .filter(|start| !family.overridden.contains(*start))
        {
            let end = rdate.checked_add_signed(duration).ok_or_else(|| {
                Error::Internal(format!("occurrence end out of range for {}", rdate))
            })?;
            if is_active(query, rdate, &end) {
                tracing::debug!("UID {} active through RDATE {}", family.uid, rdate);
                return Ok(master.name.as_deref());
            }
        }

        if self.rule_active_at(query, family)? {
            return Ok(master.name.as_deref());
        }

        Ok(None)
    }

    /// `family` 由规则生成的实例是否在 `query` 时刻进行
    ///
    /// 由第一个包含 `query` 的候选决定，其开始时间未被排除也未被覆盖时才算。
    pub fn rule_active_at(&self, query: &Instant, family: &RecurringFamily<'_>) -> Result<bool> {
        let anchor = Occurrence::new(family.master.start, family.master.end);
        let hit = Occurrences::new(family.rule, anchor)?
            .take_while(|candidate| candidate.start <= *query)
            .find(|candidate| candidate.contains(query));

        Ok(match hit {
            Some(occurrence) if family.is_suppressed(&occurrence.start) => {
                tracing::debug!(
                    "UID {} occurrence at {} is excluded or overridden",
                    family.uid,
                    occurrence.start
                );
                false
            }
            Some(_) => true,
            None => false,
        })
    }
}

#[cfg(test)]
mod tests;
