//! Interval algebra of the binding relations.
//!
//! Each row of a binding relation ties one key (a private IP, a public IP and
//! hostname pair, or a related resource) to one resource over the half-open
//! interval `[not_before, not_after)`. A missing `not_after` means the binding
//! is still open. A `not_before` equal to [`epsilon`] marks a provisional row
//! created by a release whose assign has not been seen yet.
//!
//! Rows of one `(key, resource)` group are unique on `not_before`, unique on
//! `not_after` when it is set, and at most one of them is open. Both storage
//! engines enforce the same constraints, which is what makes replays no-ops.

use chrono::{DateTime, Utc};

/// Sentinel start of a provisional binding.
pub fn epsilon() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub not_before: DateTime<Utc>,
    pub not_after: Option<DateTime<Utc>>,
}

impl Interval {
    pub fn open(not_before: DateTime<Utc>) -> Self {
        Self {
            not_before,
            not_after: None,
        }
    }

    pub fn orphan(not_after: DateTime<Utc>) -> Self {
        Self {
            not_before: epsilon(),
            not_after: Some(not_after),
        }
    }

    pub fn is_open(&self) -> bool {
        self.not_after.is_none()
    }

    pub fn is_provisional(&self) -> bool {
        self.not_before == epsilon()
    }

    pub fn covers(&self, when: DateTime<Utc>) -> bool {
        self.not_before <= when && self.not_after.map_or(true, |not_after| not_after > when)
    }
}

/// Records that the binding started at `when`. Returns whether a row changed.
pub fn assign(rows: &mut Vec<Interval>, when: DateTime<Utc>) -> bool {
    if rows.iter().any(|row| row.not_before == when) {
        return false;
    }

    let upgrade = rows
        .iter_mut()
        .filter(|row| row.is_provisional() && row.not_after.is_some_and(|a| a > when))
        .min_by_key(|row| row.not_after);

    if let Some(row) = upgrade {
        row.not_before = when;

        return true;
    }

    if rows.iter().any(Interval::is_open) {
        return false;
    }

    rows.push(Interval::open(when));

    true
}

/// Records that the binding ended at `when`. Returns whether a row changed.
pub fn release(rows: &mut Vec<Interval>, when: DateTime<Utc>) -> bool {
    if rows.iter().any(|row| row.not_after == Some(when)) {
        return false;
    }

    if let Some(row) = rows
        .iter_mut()
        .find(|row| row.is_open() && row.not_before < when)
    {
        row.not_after = Some(when);

        return true;
    }

    if rows.iter().any(Interval::is_provisional) {
        return false;
    }

    rows.push(Interval::orphan(when));

    true
}
