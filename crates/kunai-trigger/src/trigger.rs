//! The recurrence-rule trigger and its firing state machine.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use kunai_rfc::rfc::ical::core::RRule;
use kunai_rfc::rfc::ical::expand::{Expansion, ExpansionOptions, expand};
use kunai_rfc::rfc::ical::parse::parse_rrule;

use crate::config::{RepeatCount, TriggerConfig};
use crate::constants::FINAL_FIRE_TIME_SCAN_LIMIT;
use crate::error::{TriggerError, TriggerResult};
use crate::exclusion::{ExclusionFilter, Screened};
use crate::key::{JobKey, TriggerKey};
use crate::misfire::MisfireInstruction;
use crate::state::{CompletionReason, FireCursor, TriggerFault, TriggerState};

/// Mutable part of a trigger, guarded by the trigger's own lock.
#[derive(Debug)]
pub(crate) struct TriggerInner {
    pub(crate) state: TriggerState,
    pub(crate) cursor: FireCursor,
    pub(crate) exclusion: Option<Arc<dyn ExclusionFilter>>,
    /// Set by fire-once-now misfire recovery: the next fire time computed
    /// after firing must lie after this instant.
    pub(crate) catch_up: Option<DateTime<Utc>>,
    /// Latest occurrence fired or skipped; the cursor resumes after it.
    pub(crate) consumed_through: Option<DateTime<Utc>>,
    /// Recompute requested while the cursor was frozen (acquired or paused).
    pub(crate) recompute_pending: bool,
    /// Deferred skip-to-next: occurrences up to this instant are passed over
    /// once the cursor is unfrozen.
    pub(crate) skip_pending: Option<DateTime<Utc>>,
}

impl TriggerInner {
    fn complete(&mut self, reason: CompletionReason) {
        self.cursor.next_fire = None;
        self.state = TriggerState::Complete { reason };
    }

    fn fail(&mut self, fault: TriggerFault) {
        self.cursor.next_fire = None;
        self.state = TriggerState::Error { fault };
    }

    /// The cursor must not move while a firing is in flight or the trigger
    /// is paused.
    pub(crate) const fn cursor_frozen(&self) -> bool {
        matches!(
            self.state,
            TriggerState::Acquired | TriggerState::Paused { .. }
        )
    }

    /// Records a recompute to apply once the cursor is unfrozen.
    pub(crate) fn defer(&mut self, skip_through: Option<DateTime<Utc>>) {
        self.recompute_pending = true;
        if let Some(through) = skip_through {
            self.skip_pending = Some(self.skip_pending.map_or(through, |s| s.max(through)));
        }
    }
}

/// A trigger whose fire times follow an RFC 5545 recurrence rule.
///
/// Immutable settings live directly on the struct; the state and fire cursor
/// sit behind a per-trigger mutex, so a trigger can be shared across host
/// worker threads through an `Arc`.
#[derive(Debug)]
pub struct RecurrenceRuleTrigger {
    key: TriggerKey,
    job_key: JobKey,
    expression: String,
    rule: RRule,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    time_zone: Tz,
    repeat_count: RepeatCount,
    misfire_instruction: MisfireInstruction,
    priority: i32,
    options: ExpansionOptions,
    inner: Mutex<TriggerInner>,
}

impl RecurrenceRuleTrigger {
    /// ## Summary
    /// Validates `config` and computes the first fire time.
    ///
    /// The start instant is truncated to whole seconds. A rule with no
    /// occurrence in the window yields a trigger that is already `Complete`;
    /// a rule found unsatisfiable yields one in `Error`.
    ///
    /// ## Errors
    ///
    /// Returns `TriggerError::InvalidRecurrenceRule` for malformed rule text
    /// and `TriggerError::InvalidConfiguration` when the end precedes the
    /// start, the repeat count is zero or the empty-period bound is zero.
    pub fn new(
        config: TriggerConfig,
        exclusion: Option<Arc<dyn ExclusionFilter>>,
    ) -> TriggerResult<Self> {
        let rule = parse_rrule(&config.recurrence_rule)?;

        let start = config.start.with_nanosecond(0).unwrap_or(config.start);
        if let Some(end) = config.end
            && end < start
        {
            return Err(TriggerError::InvalidConfiguration(format!(
                "end {end} precedes start {start}"
            )));
        }
        if config.repeat_count == RepeatCount::Times(0) {
            return Err(TriggerError::InvalidConfiguration(
                "repeat count must be positive".to_string(),
            ));
        }
        if config.expansion.max_empty_periods == 0 {
            return Err(TriggerError::InvalidConfiguration(
                "max_empty_periods must be positive".to_string(),
            ));
        }

        let trigger = Self {
            key: config.key,
            job_key: config.job_key,
            expression: config.recurrence_rule,
            rule,
            start,
            end: config.end,
            time_zone: config.time_zone,
            repeat_count: config.repeat_count,
            misfire_instruction: config.misfire_instruction,
            priority: config.priority,
            // The end instant is applied by the trigger, not the expander
            options: config.expansion.with_range_end(None),
            inner: Mutex::new(TriggerInner {
                state: TriggerState::Waiting,
                cursor: FireCursor::default(),
                exclusion,
                catch_up: None,
                consumed_through: None,
                recompute_pending: false,
                skip_pending: None,
            }),
        };

        {
            let mut inner = trigger.lock();
            trigger.advance_cursor(&mut inner, None, None);
            tracing::debug!(
                trigger = %trigger.key,
                rule = %trigger.rule,
                next_fire = ?inner.cursor.next_fire,
                state = %inner.state,
                "Created trigger"
            );
        }

        Ok(trigger)
    }

    /// Locks the mutable state, recovering from poisoning.
    pub(crate) fn lock(&self) -> MutexGuard<'_, TriggerInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                self.inner.clear_poison();
                poisoned.into_inner()
            }
        }
    }

    fn expansion(&self, after: Option<DateTime<Utc>>) -> Expansion<'_> {
        expand(&self.rule, self.start, self.time_zone, after, self.options)
    }

    fn screened<'a>(
        &'a self,
        filter: Option<&'a dyn ExclusionFilter>,
        after: Option<DateTime<Utc>>,
    ) -> Screened<'a, Expansion<'a>> {
        Screened::new(
            self.expansion(after),
            filter,
            self.end,
            self.options.max_empty_periods,
        )
    }

    /// ## Summary
    /// Moves `next_fire` to the first accepted occurrence after `after`.
    ///
    /// Accepted occurrences at or before `skip_through` are passed over and
    /// counted as skipped.
    ///
    /// ## Side Effects
    ///
    /// Completes the trigger when the repeat limit, the end instant or the
    /// rule runs out, and moves it to `Error` when expansion fails.
    pub(crate) fn advance_cursor(
        &self,
        inner: &mut TriggerInner,
        after: Option<DateTime<Utc>>,
        skip_through: Option<DateTime<Utc>>,
    ) {
        let filter = inner.exclusion.clone();
        let mut candidates = self.screened(filter.as_deref(), after);

        loop {
            if self.repeat_count.is_reached(inner.cursor.consumed()) {
                inner.complete(CompletionReason::RepeatLimitReached);
                break;
            }

            match candidates.next() {
                Some(Ok(instant)) if skip_through.is_some_and(|through| instant <= through) => {
                    inner.cursor.skipped_count = inner.cursor.skipped_count.saturating_add(1);
                    inner.consumed_through = Some(instant);
                    tracing::trace!(trigger = %self.key, %instant, "Skipped occurrence");
                }
                Some(Ok(instant)) => {
                    inner.cursor.next_fire = Some(instant);
                    break;
                }
                Some(Err(err)) => {
                    tracing::error!(
                        trigger = %self.key,
                        rule = %self.rule,
                        %err,
                        "Trigger failed"
                    );
                    match TriggerFault::from_error(&err) {
                        Some(fault) => inner.fail(fault),
                        None => inner.fail(TriggerFault::ExpansionExhausted),
                    }
                    break;
                }
                None => {
                    let reason = if candidates.passed_end() {
                        CompletionReason::EndReached
                    } else {
                        CompletionReason::RuleExhausted
                    };
                    inner.complete(reason);
                    break;
                }
            }
        }

        if inner.state.is_terminal() {
            tracing::debug!(trigger = %self.key, state = ?inner.state, "Trigger finished");
        }
    }

    /// ## Summary
    /// Claims the trigger for execution when its next fire time is due.
    ///
    /// ## Errors
    ///
    /// Returns the current state, unchanged, when the trigger is not
    /// `Waiting` or not yet due. Firing a terminal trigger is logged as a
    /// contract violation.
    ///
    /// ## Side Effects
    ///
    /// On success the trigger moves from `Waiting` to `Acquired` and the
    /// scheduled fire time is returned.
    pub fn fire(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, TriggerState> {
        let mut inner = self.lock();
        let state = inner.state;

        if state.is_terminal() {
            tracing::warn!(trigger = %self.key, %state, "Fire requested on a terminal trigger");
            return Err(state);
        }

        match (state, inner.cursor.next_fire) {
            (TriggerState::Waiting, Some(next)) if next <= now => {
                inner.state = TriggerState::Acquired;
                tracing::debug!(trigger = %self.key, scheduled = %next, %now, "Trigger acquired");
                Ok(next)
            }
            _ => Err(state),
        }
    }

    /// ## Summary
    /// Records that the host executed the acquired firing and computes the
    /// next fire time.
    ///
    /// ## Side Effects
    ///
    /// The fired time becomes the previous fire time and the fire count
    /// increases. The trigger returns to `Waiting` unless it completes or
    /// fails, and any misfire skip or exclusion change requested during the
    /// firing is applied now. A trigger paused mid-execution stays paused
    /// with no next fire time until it is resumed. Calling this on a
    /// trigger that is not executing is logged and ignored.
    pub fn trigger_fired(&self, now: DateTime<Utc>) -> TriggerState {
        let mut inner = self.lock();

        let resume_state = match inner.state {
            TriggerState::Acquired => TriggerState::Waiting,
            TriggerState::Paused { acquired: true } => TriggerState::Paused { acquired: false },
            state => {
                tracing::warn!(
                    trigger = %self.key,
                    %state,
                    "Fired acknowledgment without acquisition"
                );
                return state;
            }
        };

        let fired = inner.cursor.next_fire;
        inner.cursor.previous_fire = fired;
        inner.consumed_through = fired;
        inner.cursor.fire_count = inner.cursor.fire_count.saturating_add(1);
        inner.state = resume_state;

        let skip_through = match (inner.catch_up.take(), inner.skip_pending.take()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        if inner.state.is_paused() {
            inner.cursor.next_fire = None;
            if self.repeat_count.is_reached(inner.cursor.consumed()) {
                inner.complete(CompletionReason::RepeatLimitReached);
            } else {
                inner.defer(skip_through);
            }
        } else {
            inner.recompute_pending = false;
            self.advance_cursor(&mut inner, fired, skip_through);
        }

        tracing::debug!(
            trigger = %self.key,
            fired = ?fired,
            %now,
            next_fire = ?inner.cursor.next_fire,
            fire_count = inner.cursor.fire_count,
            state = %inner.state,
            "Trigger fired"
        );
        inner.state
    }

    /// ## Summary
    /// Pauses or resumes the trigger.
    ///
    /// A trigger paused while `Acquired` resumes as `Acquired` unless the
    /// host acknowledged the firing in between. Terminal triggers are left
    /// unchanged.
    ///
    /// ## Side Effects
    ///
    /// Pausing never touches the cursor. Resuming to `Waiting` applies any
    /// recompute deferred while paused, which may complete or fail the
    /// trigger.
    pub fn set_paused(&self, paused: bool) -> TriggerState {
        let mut inner = self.lock();
        let next = match (inner.state, paused) {
            (TriggerState::Waiting, true) => TriggerState::Paused { acquired: false },
            (TriggerState::Acquired, true) => TriggerState::Paused { acquired: true },
            (TriggerState::Paused { acquired: false }, false) => TriggerState::Waiting,
            (TriggerState::Paused { acquired: true }, false) => TriggerState::Acquired,
            (state, _) => state,
        };

        if next != inner.state {
            tracing::debug!(
                trigger = %self.key,
                from = %inner.state,
                to = %next,
                "Pause state changed"
            );
            inner.state = next;
        }

        if inner.state == TriggerState::Waiting && inner.recompute_pending {
            let resume = inner.consumed_through;
            let skip_through = inner.skip_pending.take();
            inner.recompute_pending = false;
            self.advance_cursor(&mut inner, resume, skip_through);
            tracing::debug!(
                trigger = %self.key,
                next_fire = ?inner.cursor.next_fire,
                state = %inner.state,
                "Applied deferred recompute"
            );
        }
        inner.state
    }

    /// ## Summary
    /// Replaces the exclusion filter and recomputes the next fire time from
    /// the last fired or skipped occurrence.
    ///
    /// If the recomputed time is already misfired by more than `threshold`
    /// at `now`, occurrences up to `now` are skipped.
    ///
    /// ## Side Effects
    ///
    /// May complete or fail the trigger like any cursor advance. Terminal
    /// triggers only record the new filter. While a firing is in flight or
    /// the trigger is paused, the recompute is deferred until
    /// [`Self::trigger_fired`] or resumption; the misfire check is left to
    /// the host at that point.
    pub fn update_with_new_exclusion(
        &self,
        exclusion: Option<Arc<dyn ExclusionFilter>>,
        now: DateTime<Utc>,
        threshold: TimeDelta,
    ) -> TriggerState {
        let mut inner = self.lock();
        inner.exclusion = exclusion;
        if inner.state.is_terminal() {
            return inner.state;
        }
        if inner.cursor_frozen() {
            inner.defer(None);
            tracing::debug!(
                trigger = %self.key,
                state = %inner.state,
                "Exclusion filter replaced, recompute deferred"
            );
            return inner.state;
        }

        let resume = inner.consumed_through;
        self.advance_cursor(&mut inner, resume, None);

        let misfired = inner
            .cursor
            .next_fire
            .is_some_and(|next| now.signed_duration_since(next) > threshold);
        if misfired {
            self.advance_cursor(&mut inner, resume, Some(now));
        }

        tracing::debug!(
            trigger = %self.key,
            next_fire = ?inner.cursor.next_fire,
            state = %inner.state,
            "Exclusion filter replaced"
        );
        inner.state
    }

    /// ## Summary
    /// Returns the first accepted fire time strictly after `after`, or the
    /// first one at or after the start when `after` is `None`.
    ///
    /// The cursor and repeat limit are not consulted.
    ///
    /// ## Errors
    ///
    /// Returns the expansion or exclusion error that would fail the trigger.
    pub fn fire_time_after(
        &self,
        after: Option<DateTime<Utc>>,
    ) -> TriggerResult<Option<DateTime<Utc>>> {
        let filter = self.lock().exclusion.clone();
        self.screened(filter.as_deref(), after).next().transpose()
    }

    /// ## Summary
    /// Returns the last fire time of a bounded trigger, ignoring exclusions.
    ///
    /// A trigger is bounded by COUNT, UNTIL, its end instant or a finite
    /// repeat limit. Returns `None` when unbounded, when nothing fires, or
    /// when the last fire time lies more than [`FINAL_FIRE_TIME_SCAN_LIMIT`]
    /// occurrences after the start.
    ///
    /// ## Errors
    ///
    /// Returns `TriggerError::ExpansionExhausted` for unsatisfiable rules.
    pub fn final_fire_time(&self) -> TriggerResult<Option<DateTime<Utc>>> {
        self.final_fire_time_within(FINAL_FIRE_TIME_SCAN_LIMIT)
    }

    pub(crate) fn final_fire_time_within(
        &self,
        scan_limit: u32,
    ) -> TriggerResult<Option<DateTime<Utc>>> {
        let limit = match self.repeat_count {
            RepeatCount::Times(n) => Some(n),
            RepeatCount::Indefinitely if self.rule.is_finite() || self.end.is_some() => None,
            RepeatCount::Indefinitely => return Ok(None),
        };

        let mut last = None;
        let mut taken = 0_u32;
        for instant in self.screened(None, None) {
            if taken >= scan_limit {
                tracing::debug!(
                    trigger = %self.key,
                    scan_limit,
                    "Final fire time lies beyond the scan limit"
                );
                return Ok(None);
            }
            last = Some(instant?);
            taken += 1;
            if limit.is_some_and(|n| taken >= n) {
                break;
            }
        }
        Ok(last)
    }

    /// ## Summary
    /// Returns up to `n` upcoming fire times starting with the next one,
    /// honouring exclusions and the remaining repeat limit.
    ///
    /// ## Errors
    ///
    /// Returns the expansion or exclusion error that would fail the trigger.
    pub fn preview(&self, n: usize) -> TriggerResult<Vec<DateTime<Utc>>> {
        let (cursor, filter) = {
            let inner = self.lock();
            (inner.cursor, inner.exclusion.clone())
        };
        let Some(next) = cursor.next_fire else {
            return Ok(Vec::new());
        };

        let remaining = self
            .repeat_count
            .remaining(cursor.consumed())
            .map_or(n, |r| n.min(usize::try_from(r).unwrap_or(usize::MAX)));

        let mut times = Vec::with_capacity(remaining.min(64));
        if remaining > 0 {
            times.push(next);
        }
        for instant in self
            .screened(filter.as_deref(), Some(next))
            .take(remaining.saturating_sub(1))
        {
            times.push(instant?);
        }
        Ok(times)
    }

    #[must_use]
    pub fn key(&self) -> &TriggerKey {
        &self.key
    }

    #[must_use]
    pub fn job_key(&self) -> &JobKey {
        &self.job_key
    }

    /// The rule text exactly as configured.
    #[must_use]
    pub fn recurrence_rule_expression(&self) -> &str {
        &self.expression
    }

    #[must_use]
    pub fn rule(&self) -> &RRule {
        &self.rule
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    #[must_use]
    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    #[must_use]
    pub fn repeat_count(&self) -> RepeatCount {
        self.repeat_count
    }

    #[must_use]
    pub fn misfire_instruction(&self) -> MisfireInstruction {
        self.misfire_instruction
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[must_use]
    pub fn state(&self) -> TriggerState {
        self.lock().state
    }

    /// Snapshot of the fire cursor.
    #[must_use]
    pub fn cursor(&self) -> FireCursor {
        self.lock().cursor
    }

    #[must_use]
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.lock().cursor.next_fire
    }

    #[must_use]
    pub fn previous_fire_time(&self) -> Option<DateTime<Utc>> {
        self.lock().cursor.previous_fire
    }

    #[must_use]
    pub fn fire_count(&self) -> u32 {
        self.lock().cursor.fire_count
    }

    #[must_use]
    pub fn skipped_count(&self) -> u32 {
        self.lock().cursor.skipped_count
    }

    /// False once the trigger is `Complete` or in `Error`.
    #[must_use]
    pub fn may_fire_again(&self) -> bool {
        let inner = self.lock();
        !inner.state.is_terminal() && (inner.cursor.next_fire.is_some() || inner.recompute_pending)
    }
}

/// ## Summary
/// Orders triggers for firing: earlier next fire time first (triggers that
/// will not fire last), then higher priority, then key.
#[must_use]
pub fn compare_fire_order(a: &RecurrenceRuleTrigger, b: &RecurrenceRuleTrigger) -> Ordering {
    let by_time = match (a.next_fire_time(), b.next_fire_time()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_time
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.key.cmp(&b.key))
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
