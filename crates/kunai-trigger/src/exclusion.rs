//! Host-supplied vetoes on candidate fire times.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::{TriggerError, TriggerResult};

/// Predicate over candidate fire instants, backed by whatever calendar the
/// host keeps (holidays, maintenance windows).
///
/// Implemented for any `Fn(DateTime<Utc>) -> bool` closure.
pub trait ExclusionFilter: Send + Sync {
    /// Returns true when the trigger must not fire at `instant`.
    fn is_excluded(&self, instant: DateTime<Utc>) -> bool;
}

impl<F> ExclusionFilter for F
where
    F: Fn(DateTime<Utc>) -> bool + Send + Sync,
{
    fn is_excluded(&self, instant: DateTime<Utc>) -> bool {
        self(instant)
    }
}

impl std::fmt::Debug for dyn ExclusionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExclusionFilter")
    }
}

/// Exclusion filter over an explicit set of blocked instants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedInstants {
    instants: BTreeSet<DateTime<Utc>>,
}

impl ExcludedInstants {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instant to the blocked set.
    #[must_use]
    pub fn with(mut self, instant: DateTime<Utc>) -> Self {
        self.instants.insert(instant);
        self
    }

    pub fn insert(&mut self, instant: DateTime<Utc>) -> bool {
        self.instants.insert(instant)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }
}

impl FromIterator<DateTime<Utc>> for ExcludedInstants {
    fn from_iter<T: IntoIterator<Item = DateTime<Utc>>>(iter: T) -> Self {
        Self {
            instants: iter.into_iter().collect(),
        }
    }
}

impl ExclusionFilter for ExcludedInstants {
    fn is_excluded(&self, instant: DateTime<Utc>) -> bool {
        self.instants.contains(&instant)
    }
}

/// Candidate stream with exclusions and the trigger's end instant applied.
///
/// Yields accepted instants in order. Ends when the candidates run out or
/// pass `end` (recorded in [`Screened::passed_end`]), and yields an
/// [`TriggerError::ExclusionDeadlock`] after `limit` consecutive exclusions.
pub(crate) struct Screened<'a, I> {
    candidates: I,
    filter: Option<&'a dyn ExclusionFilter>,
    end: Option<DateTime<Utc>>,
    limit: u32,
    passed_end: bool,
    failed: bool,
}

impl<'a, I> Screened<'a, I> {
    pub(crate) fn new(
        candidates: I,
        filter: Option<&'a dyn ExclusionFilter>,
        end: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Self {
        Self {
            candidates,
            filter,
            end,
            limit,
            passed_end: false,
            failed: false,
        }
    }

    /// True once a candidate past the end instant was seen.
    pub(crate) const fn passed_end(&self) -> bool {
        self.passed_end
    }
}

impl<I, E> Iterator for Screened<'_, I>
where
    I: Iterator<Item = Result<DateTime<Utc>, E>>,
    TriggerError: From<E>,
{
    type Item = TriggerResult<DateTime<Utc>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.passed_end {
            return None;
        }

        let mut excluded = 0_u32;
        loop {
            let instant = match self.candidates.next()? {
                Ok(instant) => instant,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err.into()));
                }
            };

            if self.end.is_some_and(|end| instant > end) {
                self.passed_end = true;
                return None;
            }

            if !self.filter.is_some_and(|f| f.is_excluded(instant)) {
                return Some(Ok(instant));
            }

            excluded += 1;
            tracing::trace!(%instant, excluded, "Candidate excluded");
            if excluded >= self.limit {
                self.failed = true;
                return Some(Err(TriggerError::ExclusionDeadlock { limit: self.limit }));
            }
        }
    }
}
