// src/handlers/busy.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::AppError;

/// Per-action "in progress" flag. While a guard is alive a second
/// `try_begin` fails with [`AppError::Busy`] instead of queueing.
#[derive(Debug, Clone)]
pub struct BusyFlag {
    action: &'static str,
    flag: Arc<AtomicBool>,
}

/// Clears its flag when dropped, whichever way the action ended.
#[derive(Debug)]
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyFlag {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn try_begin(&self) -> Result<BusyGuard, AppError> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                tracing::debug!(action = self.action, "Rejected while busy");
                AppError::Busy(self.action)
            })?;
        Ok(BusyGuard {
            flag: self.flag.clone(),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Stale-response guard. Each request takes a ticket; only the most
/// recently issued ticket may apply its result, and `invalidate` (the user
/// navigated away) voids every outstanding one.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    latest: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// `Some(value)` if the ticket is still current, otherwise the value is
    /// dropped.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            tracing::debug!(ticket = ticket.0, "Discarding stale response");
            None
        }
    }
}
