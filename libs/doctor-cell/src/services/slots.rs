use std::collections::HashSet;
use std::iter;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use shared_models::scheduling::{AvailabilityRule, UnavailabilityException};

use crate::models::Slot;
use crate::services::interval::overlaps;

/// UTC weekday of `date`, Sunday = 0.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Length of one slot of `rule`, or `None` for a rule that cannot yield slots.
pub fn slot_length(rule: &AvailabilityRule) -> Option<Duration> {
    (rule.slot_minutes > 0).then(|| Duration::minutes(i64::from(rule.slot_minutes)))
}

/// The rule's window anchored to `date`, in UTC.
pub fn rule_window(rule: &AvailabilityRule, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        date.and_time(rule.start_time).and_utc(),
        date.and_time(rule.end_time).and_utc(),
    )
}

/// True when `starts_at` is one of the slot boundaries `rule` walks on `date`.
pub fn on_grid(rule: &AvailabilityRule, date: NaiveDate, starts_at: DateTime<Utc>) -> bool {
    let (window_start, _) = rule_window(rule, date);
    let offset = (starts_at - window_start).num_nanoseconds();
    let step = slot_length(rule).and_then(|step| step.num_nanoseconds());

    match (offset, step) {
        (Some(offset), Some(step)) => offset >= 0 && offset % step == 0,
        _ => false,
    }
}

/// True when `[starts_at, ends_at)` touches any exception.
pub fn blocked_by(exceptions: &[UnavailabilityException], starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
    exceptions
        .iter()
        .any(|e| overlaps(&starts_at, &ends_at, &e.starts_at, &e.ends_at))
}

/// Expands weekly rules into concrete slots, minus exceptions and starts
/// already taken by live appointments.
///
/// Slots are keyed by `starts_at`: when rules of the same weekday overlap,
/// the rule with the earliest `start_time` supplies the slot.
#[derive(Debug, Default)]
pub struct SlotGenerator {
    rules_by_weekday: [Vec<AvailabilityRule>; 7],
    exceptions: Vec<UnavailabilityException>,
    taken: HashSet<DateTime<Utc>>,
}

impl SlotGenerator {
    pub fn new(
        rules: Vec<AvailabilityRule>,
        exceptions: Vec<UnavailabilityException>,
        taken: impl IntoIterator<Item = DateTime<Utc>>,
    ) -> Self {
        let mut rules_by_weekday: [Vec<AvailabilityRule>; 7] = Default::default();
        for rule in rules {
            if let Some(day) = rules_by_weekday.get_mut(usize::from(rule.weekday)) {
                day.push(rule);
            }
        }
        for day in rules_by_weekday.iter_mut() {
            day.sort_by_key(|r| r.start_time);
        }

        Self {
            rules_by_weekday,
            exceptions,
            taken: taken.into_iter().collect(),
        }
    }

    /// Free slots starting in `[from, to)`, ascending by `starts_at`.
    pub fn slots(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> impl Iterator<Item = Slot> + '_ {
        iter::successors(Some(from.date_naive()), |day| day.succ_opt())
            .take_while(move |day| from < to && day.and_time(NaiveTime::MIN).and_utc() < to)
            .flat_map(move |day| self.day_slots(day))
            .filter(move |slot| slot.starts_at >= from && slot.starts_at < to)
    }

    fn day_slots(&self, day: NaiveDate) -> Vec<Slot> {
        let rules = &self.rules_by_weekday[usize::from(weekday_index(day))];

        let mut slots: Vec<Slot> = rules
            .iter()
            .flat_map(|rule| Self::walk(rule, day))
            .filter(|slot| !blocked_by(&self.exceptions, slot.starts_at, slot.ends_at))
            .filter(|slot| !self.taken.contains(&slot.starts_at))
            .collect();

        slots.sort_by_key(|slot| slot.starts_at);
        slots.dedup_by_key(|slot| slot.starts_at);
        slots
    }

    /// Every full slot of `rule` on `day`. A trailing partial slot is dropped.
    fn walk(rule: &AvailabilityRule, day: NaiveDate) -> impl Iterator<Item = Slot> {
        let (window_start, window_end) = rule_window(rule, day);
        let step = slot_length(rule);

        iter::successors(step.map(|_| window_start), move |cursor| step.map(|s| *cursor + s))
            .map_while(move |starts_at| {
                let ends_at = starts_at + step?;
                (ends_at <= window_end).then_some(Slot { starts_at, ends_at })
            })
    }
}
