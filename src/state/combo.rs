//! Per-actor combo windows for NPCs.
//!
//! An NPC's random selector is re-rolled once its combo window runs out. The
//! window map sits behind one mutex that is only held for the read-modify-write
//! of an entry; resolution and the weighted draw happen outside it.
//!
//! An entry outlives its window so that recent picks carry into the next
//! combo. Entries idle for longer than the retention period are evicted by the
//! sweep.

use crate::models::{ActorSnapshot, FormRef, Settings};
use crate::services::{RecentPicks, next_weighted_no_repeat};
use crate::state::MovesetManager;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Host-supplied actor data
#[cfg_attr(test, mockall::automock)]
pub trait ActorSource: Send + Sync {
    /// Identity and live stats, `None` if the actor is gone
    fn snapshot(&self, actor: &FormRef) -> Option<ActorSnapshot>;

    /// Name of the category matching what the actor has equipped
    fn equipped_category(&self, actor: &FormRef) -> Option<String>;
}

/// A re-rolled NPC selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEvent {
    pub actor: FormRef,
    /// New random-selector value, 0 if nothing was available
    pub ordinal: u32,
    /// Priority tag of the rule that supplied the candidates
    pub tier: i32,
}

/// Idle windows kept per actor before eviction, in multiples of the combo window
const RETAINED_WINDOWS: u32 = 8;

const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy)]
struct ComboWindow {
    deadline: Option<Instant>,
    recent: RecentPicks,
    ordinal: u32,
    last_active: Instant,
}

impl ComboWindow {
    fn new(now: Instant) -> Self {
        Self {
            deadline: None,
            recent: RecentPicks::default(),
            ordinal: 0,
            last_active: now,
        }
    }
}

pub struct ComboTracker {
    windows: Mutex<HashMap<FormRef, ComboWindow>>,
    window: Duration,
    retention: Duration,
    sweep_period: Duration,
    events: broadcast::Sender<SelectionEvent>,
}

impl ComboTracker {
    pub fn new(window: Duration) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
            retention: window * RETAINED_WINDOWS,
            sweep_period: DEFAULT_SWEEP_PERIOD,
            events,
        }
    }

    /// Window length and sweep period from "Combo Window Ms" and "Sweep Interval Ms"
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(Duration::from_millis(settings.combo_window_ms))
            .with_sweep_period(Duration::from_millis(settings.sweep_interval_ms))
    }

    pub fn with_sweep_period(mut self, period: Duration) -> Self {
        // tokio intervals reject a zero period
        self.sweep_period = period.max(Duration::from_millis(1));
        self
    }

    /// How long a closed window is kept before the sweep evicts it
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn sweep_period(&self) -> Duration {
        self.sweep_period
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SelectionEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<FormRef, ComboWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start or extend an actor's window
    pub fn open_window(&self, actor: &FormRef, now: Instant) {
        let mut windows = self.lock();
        let window = windows
            .entry(actor.clone())
            .or_insert_with(|| ComboWindow::new(now));
        window.deadline = Some(now + self.window);
        window.last_active = now;
    }

    /// Close a window without re-rolling; recent picks are kept
    pub fn close_window(&self, actor: &FormRef) {
        if let Some(window) = self.lock().get_mut(actor) {
            window.deadline = None;
        }
    }

    pub fn is_open(&self, actor: &FormRef) -> bool {
        self.lock().get(actor).is_some_and(|w| w.deadline.is_some())
    }

    /// Last ordinal rolled for an actor, 0 if none
    pub fn current_ordinal(&self, actor: &FormRef) -> u32 {
        self.lock().get(actor).map(|w| w.ordinal).unwrap_or(0)
    }

    /// Drop all tracking for an actor, e.g. when it unloads
    pub fn forget(&self, actor: &FormRef) {
        self.lock().remove(actor);
    }

    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    /// Evict entries idle past the retention period, then close every expired window
    fn take_expired(&self, now: Instant) -> Vec<(FormRef, RecentPicks)> {
        let mut windows = self.lock();

        let before = windows.len();
        let retention = self.retention;
        windows.retain(|_, w| w.deadline.is_some() || now.saturating_duration_since(w.last_active) < retention);
        let evicted = before - windows.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} idle combo windows", evicted);
        }

        windows
            .iter_mut()
            .filter(|(_, w)| w.deadline.is_some_and(|deadline| deadline <= now))
            .map(|(actor, w)| {
                w.deadline = None;
                w.last_active = now;
                (actor.clone(), w.recent)
            })
            .collect()
    }

    /// Re-roll every actor whose window expired at or before `now`.
    ///
    /// Closed windows idle for the retention period are dropped in the same pass.
    pub fn sweep<R: Rng + ?Sized>(
        &self,
        now: Instant,
        source: &dyn ActorSource,
        manager: &MovesetManager,
        rng: &mut R,
    ) -> Vec<SelectionEvent> {
        let expired = self.take_expired(now);
        let mut events = Vec::with_capacity(expired.len());

        for (actor, mut recent) in expired {
            let Some(snapshot) = source.snapshot(&actor) else {
                tracing::debug!("Actor {} no longer available, dropping window", actor);
                self.forget(&actor);
                continue;
            };
            let Some(category) = source.equipped_category(&actor) else {
                tracing::trace!("Actor {} has no matching category equipped", actor);
                continue;
            };

            let (resolution, candidates) = manager.npc_candidates(Some(&snapshot), &category);
            let ordinal = next_weighted_no_repeat(&candidates, &mut recent, rng);

            let written = match self.lock().get_mut(&actor) {
                Some(window) => {
                    window.recent = recent;
                    window.ordinal = ordinal;
                    window.last_active = now;
                    true
                }
                None => false,
            };
            if !written {
                continue;
            }

            manager.metrics().record_npc_reroll();
            tracing::trace!("Actor {} rerolled {} to {}", actor, category, ordinal);

            let event = SelectionEvent {
                actor,
                ordinal,
                tier: resolution.tier,
            };
            let _ = self.events.send(event.clone());
            events.push(event);
        }

        events
    }

    /// Run [`sweep`](Self::sweep) every sweep period on the tokio runtime
    pub fn spawn_sweeper(self: Arc<Self>, source: Arc<dyn ActorSource>, manager: Arc<MovesetManager>) -> JoinHandle<()> {
        let period = self.sweep_period;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            let mut rng = StdRng::from_entropy();
            tracing::debug!("Combo sweeper started ({}ms period)", period.as_millis());
            loop {
                interval.tick().await;
                self.sweep(Instant::now(), source.as_ref(), &manager, &mut rng);
            }
        })
    }
}
