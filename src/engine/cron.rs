//! The cron scheduler: decides when a `CronTrigger` is due and, when it is,
//! runs its contract call against the chain head.
//!
//! The only state involved is the trigger's `LastFired`, which belongs to
//! the store. The scheduler reports the instant it fired at; persisting it
//! is the caller's job.

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use thiserror::Error;

use super::contracts::{ContractCallOutcome, ContractMatchError, ContractMatcher};
use crate::models::{Match, Trigger};

/// Errors raised by cron scheduling.
#[derive(Debug, Error)]
pub enum CronError {
    /// The rule is not a valid five-field cron expression.
    #[error("Invalid cron rule '{rule}': {reason}")]
    InvalidRule {
        /// The rule as authored.
        rule: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The timezone is not a `±HHMM` offset.
    #[error("Invalid timezone offset '{0}', expected ±HHMM")]
    InvalidTimezone(String),

    /// The trigger carries no cron job.
    #[error("Trigger has no cron job")]
    MissingCronJob,

    /// The contract call made on firing could not be evaluated.
    #[error("Cron evaluation failed: {0}")]
    Evaluation(#[from] ContractMatchError),
}

/// A parsed cron rule read in a fixed UTC offset.
///
/// When both the day-of-month and the weekday field are restricted the rule
/// fires on either, so it is held as two schedules.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    schedules: Vec<Schedule>,
    offset: FixedOffset,
}

impl CronSchedule {
    /// Parses a standard five-field rule (`minute hour day month weekday`)
    /// and a `±HHMM` offset.
    pub fn parse(rule: &str, timezone: &str) -> Result<Self, CronError> {
        let invalid = |reason: String| CronError::InvalidRule { rule: rule.to_string(), reason };

        let fields = rule.split_whitespace().collect::<Vec<_>>();
        let [minute, hour, day, month, weekday] = fields.as_slice() else {
            return Err(invalid(format!("expected 5 fields, found {}", fields.len())));
        };
        let weekday = weekdays(weekday);
        let day_fields = if restricted(day) && restricted(&weekday) {
            vec![(*day, "*"), ("*", weekday.as_str())]
        } else {
            vec![(*day, weekday.as_str())]
        };
        let schedules = day_fields
            .into_iter()
            .map(|(day, weekday)| {
                Schedule::from_str(&format!("0 {minute} {hour} {day} {month} {weekday}"))
                    .map_err(|e| invalid(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { schedules, offset: parse_offset(timezone)? })
    }

    /// The UTC offset the rule is read in.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The first occurrence strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let after = after.with_timezone(&self.offset);
        self.schedules
            .iter()
            .filter_map(|schedule| schedule.after(&after).next())
            .min()
            .map(|next| next.with_timezone(&Utc))
    }

    /// Whether a trigger last fired at `last_fired` is due at `now`.
    ///
    /// A trigger that never fired is due immediately. Otherwise it is due
    /// from the first occurrence after `last_fired` onwards, however many
    /// occurrences have passed since.
    pub fn is_due(&self, last_fired: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_fired {
            None => true,
            Some(last_fired) => self.next_after(last_fired).is_some_and(|next| now >= next),
        }
    }
}

/// A day field is unrestricted when it starts with `*` or is `?`.
fn restricted(field: &str) -> bool {
    !field.starts_with('*') && field != "?"
}

/// Rewrites a standard weekday field (0-7, Sunday as 0 or 7) into the 1-7,
/// Sunday-first numbering the `cron` crate uses. Named days pass through.
fn weekdays(field: &str) -> String {
    field.split(',').map(weekday_item).collect::<Vec<_>>().join(",")
}

fn weekday_item(item: &str) -> String {
    let (base, step) = match item.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (item, None),
    };
    if base == "*" || base == "?" || !base.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        return item.to_string();
    }

    let bounds = match base.split_once('-') {
        Some((first, last)) => first.parse::<u32>().ok().zip(last.parse::<u32>().ok()),
        None => base.parse::<u32>().ok().map(|first| (first, if step.is_some() { 6 } else { first })),
    };
    let step = match step.map(str::parse::<usize>) {
        None => Some(1),
        Some(Ok(step)) if step > 0 => Some(step),
        Some(_) => None,
    };
    let (Some((first, last)), Some(step)) = (bounds, step) else {
        return item.to_string();
    };
    if first > 7 || last > 7 || first > last {
        return item.to_string();
    }

    let mut days = (first..=last).step_by(step).map(|d| d % 7 + 1).collect::<Vec<_>>();
    days.sort_unstable();
    days.dedup();
    days.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}

/// Parses `±HHMM` (a colon between hours and minutes is accepted).
fn parse_offset(timezone: &str) -> Result<FixedOffset, CronError> {
    let invalid = || CronError::InvalidTimezone(timezone.to_string());

    let trimmed = timezone.trim();
    let (sign, digits) = match trimmed.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let digits = digits.replace(':', "");
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours = digits[..2].parse::<i32>().map_err(|_| invalid())?;
    let minutes = digits[2..].parse::<i32>().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// What happened when a due cron trigger fired.
#[derive(Debug)]
pub struct CronFiring {
    /// The instant the trigger fired; the new `LastFired`.
    pub fired_at: DateTime<Utc>,
    /// The head block the call was made against.
    pub block_number: u64,
    /// The evaluation of the trigger's outputs.
    pub outcome: ContractCallOutcome,
    /// The match, when every output matched.
    pub matched: Option<Match>,
}

impl CronFiring {
    /// Advances the trigger's `LastFired` to the firing instant.
    pub fn record(&self, trigger: &mut Trigger) {
        trigger.last_fired = Some(self.fired_at);
    }
}

/// Fires cron triggers through the contract-call matcher.
pub struct CronScheduler {
    contracts: Arc<ContractMatcher>,
}

impl CronScheduler {
    /// Creates a new `CronScheduler`.
    pub fn new(contracts: Arc<ContractMatcher>) -> Self {
        Self { contracts }
    }

    /// Whether `trigger` is due at `now`.
    pub fn is_due(trigger: &Trigger, now: DateTime<Utc>) -> Result<bool, CronError> {
        let job = trigger.cron_job.as_ref().ok_or(CronError::MissingCronJob)?;
        Ok(job.schedule.is_due(trigger.last_fired, now))
    }

    /// Fires `trigger` if it is due at `now`: calls its function at the
    /// current head block and evaluates its outputs.
    ///
    /// Returns `Ok(None)` when the trigger is not due. On error nothing was
    /// fired and `LastFired` should stay as it is.
    #[tracing::instrument(skip(self, trigger), fields(trigger = %trigger.trigger_uuid), level = "debug")]
    pub async fn tick(&self, trigger: &Trigger, now: DateTime<Utc>) -> Result<Option<CronFiring>, CronError> {
        if !Self::is_due(trigger, now)? {
            return Ok(None);
        }

        let block_number = self.contracts.head_block().await?;
        let outcome = self.contracts.match_contract(trigger, block_number).await?;
        let matched = if outcome.matched {
            Some(self.contracts.into_match(trigger, block_number, outcome.clone())?)
        } else {
            None
        };

        tracing::info!(
            trigger = %trigger.trigger_uuid,
            block_number,
            matched = matched.is_some(),
            "Cron trigger fired."
        );

        Ok(Some(CronFiring { fired_at: now, block_number, outcome, matched }))
    }
}
