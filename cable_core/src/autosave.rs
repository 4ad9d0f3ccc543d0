//! # Debounced Autosave
//!
//! Every edit reschedules the save of its session, so a burst of edits
//! produces one save after the burst goes quiet. Time is passed in by the
//! caller (`now`), which keeps the scheduler independent of any event loop.
//!
//! ## Example
//!
//! ```rust
//! use cable_core::autosave::Debouncer;
//! use std::time::{Duration, Instant};
//!
//! let mut debouncer = Debouncer::new(Duration::from_millis(600));
//! let t0 = Instant::now();
//!
//! debouncer.schedule("calc", t0);
//! debouncer.schedule("calc", t0 + Duration::from_millis(400));
//!
//! assert!(debouncer.take_due(t0 + Duration::from_millis(700)).is_empty());
//! assert_eq!(debouncer.take_due(t0 + Duration::from_millis(1000)), vec!["calc"]);
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::session::CalcSession;
use crate::store::ProjectStore;

/// Cancel-and-reschedule timer set, one pending deadline per key.
#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    delay: Duration,
    pending: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the timer for `key`, replacing any pending deadline
    pub fn schedule(&mut self, key: K, now: Instant) {
        self.pending.insert(key, now + self.delay);
    }

    /// Drop a pending deadline; true if one existed
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Earliest pending deadline, for sleeping until the next fire
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every key whose deadline has passed
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &due {
            self.pending.remove(key);
        }
        due
    }
}

/// What a call to [`Autosaver::fire`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveOutcome {
    /// Nothing scheduled for this session, or not yet due
    NotDue,
    /// Due, but the calculation number was blank
    SkippedBlankKey,
    Saved,
    /// Due, but the save failed; the error was logged
    Failed,
}

/// Debounced saving of calculation sessions.
#[derive(Debug, Clone)]
pub struct Autosaver {
    debouncer: Debouncer<Uuid>,
}

impl Autosaver {
    pub fn new(delay: Duration) -> Self {
        Autosaver {
            debouncer: Debouncer::new(delay),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.autosave_delay())
    }

    /// Record an edit in `session`
    pub fn edited(&mut self, session: &CalcSession, now: Instant) {
        self.debouncer.schedule(session.id(), now);
    }

    /// Forget a pending save, e.g. after an explicit save
    pub fn cancel(&mut self, session: &CalcSession) -> bool {
        self.debouncer.cancel(&session.id())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    /// Save `session` if its timer has expired.
    ///
    /// A blank calculation number makes this a no-op. Save errors are
    /// logged and reported as [`AutosaveOutcome::Failed`], never returned.
    pub fn fire(&mut self, now: Instant, session: &mut CalcSession, store: &mut ProjectStore) -> AutosaveOutcome {
        let id = session.id();
        match self.debouncer.pending.get(&id) {
            Some(deadline) if *deadline <= now => {
                self.debouncer.cancel(&id);
            }
            _ => return AutosaveOutcome::NotDue,
        }

        if session.key().is_empty() {
            debug!(session = %id, "autosave skipped, no calculation number");
            return AutosaveOutcome::SkippedBlankKey;
        }

        match session.save(store) {
            Ok(()) => {
                debug!(session = %id, key = %session.key(), "autosaved");
                AutosaveOutcome::Saved
            }
            Err(err) => {
                warn!(session = %id, %err, "autosave failed");
                AutosaveOutcome::Failed
            }
        }
    }
}
