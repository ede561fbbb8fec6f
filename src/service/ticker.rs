//! Polling state machine for one source.
//!
//! A [`TickerService`] owns a [`SourceClient`], a [`RefreshTimer`] and the
//! published item lists. Every timer tick spawns a cycle; a compare-and-swap
//! on `running` keeps at most one cycle in flight and drops overlapping
//! ticks. Results are published as an immutable [`ItemsSnapshot`] through a
//! watch channel, so readers never observe a half-merged list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info};

use crate::app::{Result, TickerError};
use crate::domain::ContentItem;
use crate::fetcher::{CancelSource, CancelToken};
use crate::logging::LogSwitch;
use crate::service::merge::merge;
use crate::service::timer::{RefreshTimer, KICKOFF_DELAY};
use crate::source::{Category, FetchRequest, Fetched, SourceClient, SourceKind};

pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// How often [`TickerService::immediate_refresh`] checks for an idle service.
const IDLE_POLL: Duration = Duration::from_millis(100);

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerEvent {
    RefreshStarted,
    RefreshCompleted { has_new_items: bool },
}

/// Item lists as left by the last completed cycle.
#[derive(Debug, Default)]
pub struct ItemsSnapshot {
    pub current: Vec<Arc<ContentItem>>,
    pub new: Vec<Arc<ContentItem>>,
}

impl ItemsSnapshot {
    pub fn has_new_items(&self) -> bool {
        !self.new.is_empty()
    }
}

struct Settings {
    category: usize,
    locator: String,
    interval: Duration,
    /// Bypass the client's "nothing changed" shortcut on the next cycle.
    force: bool,
}

struct Shared {
    kind: SourceKind,
    client: tokio::sync::Mutex<Box<dyn SourceClient>>,
    settings: Mutex<Settings>,
    started: AtomicBool,
    paused: AtomicBool,
    running: AtomicBool,
    cycle: Mutex<Option<CancelSource>>,
    items: watch::Sender<Arc<ItemsSnapshot>>,
    events: broadcast::Sender<TickerEvent>,
    last_error: Mutex<Option<String>>,
    log_switch: LogSwitch,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn validate_interval(interval: Duration) -> Result<()> {
    if interval < MIN_REFRESH_INTERVAL {
        return Err(TickerError::InvalidInterval(interval.as_secs()));
    }
    Ok(())
}

impl Shared {
    async fn tick(self: Arc<Self>) {
        if self.run_guarded(false).await.is_none() {
            debug!("Previous refresh still running, tick dropped");
        }
    }

    /// `None` when another cycle already holds the guard.
    async fn run_guarded(&self, manual: bool) -> Option<bool> {
        let token = self.claim()?;

        let outcome = if !manual && self.paused.load(Ordering::Acquire) {
            debug!("Refreshing paused, tick skipped");
            false
        } else if !manual && !self.started.load(Ordering::Acquire) {
            false
        } else {
            self.run_cycle(&token).await
        };

        self.release();
        Some(outcome)
    }

    /// Take the `running` guard and install the cycle's cancel source before
    /// anything else is checked, so a stop landing right after the claim
    /// still finds a cycle to cancel.
    fn claim(&self) -> Option<CancelToken> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let source = CancelSource::new();
        let token = source.token();
        *lock(&self.cycle) = Some(source);
        Some(token)
    }

    fn release(&self) {
        lock(&self.cycle).take();
        self.running.store(false, Ordering::Release);
    }

    async fn run_cycle(&self, token: &CancelToken) -> bool {
        let _ = self.events.send(TickerEvent::RefreshStarted);

        let (locator, force) = {
            let mut settings = lock(&self.settings);
            (settings.locator.clone(), std::mem::take(&mut settings.force))
        };
        info!("Refreshing {} from {}", self.kind.name(), locator);

        let result = {
            let mut client = self.client.lock().await;
            let request = FetchRequest {
                locator: locator.clone(),
                max_items: client.max_items(),
                force,
            };
            client.fetch_all(&request, token).await
        };

        let has_new_items = match result {
            Ok(_) if token.is_cancelled() => {
                self.record_failure(TickerError::Cancelled, force);
                false
            }
            Ok(_) if lock(&self.settings).locator != locator => {
                debug!("Category changed during refresh, results discarded");
                false
            }
            Ok(fetched) => {
                *lock(&self.last_error) = None;
                self.publish(fetched)
            }
            Err(e) => {
                self.record_failure(e, force);
                false
            }
        };

        let _ = self
            .events
            .send(TickerEvent::RefreshCompleted { has_new_items });
        has_new_items
    }

    fn record_failure(&self, err: TickerError, force: bool) {
        if err.is_cancelled() {
            info!("Refresh of {} cancelled", self.kind.name());
        } else {
            error!("Refresh of {} failed: {}", self.kind.name(), err);
        }

        if force {
            lock(&self.settings).force = true;
        }
        *lock(&self.last_error) = Some(err.to_string());
    }

    fn publish(&self, fetched: Fetched) -> bool {
        let previous = self.items.borrow().clone();

        match fetched {
            Fetched::Unchanged => {
                if previous.has_new_items() {
                    self.items.send_replace(Arc::new(ItemsSnapshot {
                        current: previous.current.clone(),
                        new: Vec::new(),
                    }));
                }
                false
            }
            Fetched::Items(items) => {
                let merged = merge(&previous.current, items);
                let has_new_items = merged.has_new_items();
                info!(
                    "{} items from {}, {} new",
                    merged.current.len(),
                    self.kind.name(),
                    merged.new.len()
                );
                self.items.send_replace(Arc::new(ItemsSnapshot {
                    current: merged.current,
                    new: merged.new,
                }));
                has_new_items
            }
        }
    }

    fn cancel_in_flight(&self) {
        if let Some(source) = lock(&self.cycle).as_ref() {
            source.cancel();
        }
    }
}

pub struct TickerService {
    shared: Arc<Shared>,
    timer: Mutex<Option<RefreshTimer>>,
}

impl TickerService {
    pub fn new(
        kind: SourceKind,
        client: Box<dyn SourceClient>,
        category: usize,
        log_switch: LogSwitch,
    ) -> Result<Self> {
        let locator = kind.locator(category)?;
        let (items, _) = watch::channel(Arc::new(ItemsSnapshot::default()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let shared = Shared {
            kind,
            client: tokio::sync::Mutex::new(client),
            settings: Mutex::new(Settings {
                category,
                locator,
                interval: DEFAULT_REFRESH_INTERVAL,
                force: true,
            }),
            started: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            running: AtomicBool::new(false),
            cycle: Mutex::new(None),
            items,
            events,
            last_error: Mutex::new(None),
            log_switch,
        };

        Ok(Self {
            shared: Arc::new(shared),
            timer: Mutex::new(None),
        })
    }

    pub fn source(&self) -> SourceKind {
        self.shared.kind
    }

    pub fn categories(&self) -> &'static [Category] {
        self.shared.kind.categories()
    }

    pub fn category(&self) -> usize {
        lock(&self.shared.settings).category
    }

    pub fn refresh_interval(&self) -> Duration {
        lock(&self.shared.settings).interval
    }

    /// Whether a timer is armed.
    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::Acquire)
    }

    /// Whether a cycle is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.shared.last_error).clone()
    }

    pub fn snapshot(&self) -> Arc<ItemsSnapshot> {
        self.shared.items.borrow().clone()
    }

    pub fn subscribe_items(&self) -> watch::Receiver<Arc<ItemsSnapshot>> {
        self.shared.items.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TickerEvent> {
        self.shared.events.subscribe()
    }

    /// Arm the timer: first tick after [`KICKOFF_DELAY`], then every
    /// `interval`. Must be called from within a tokio runtime.
    pub fn start_refreshing(&self, interval: Duration, category: usize) -> Result<()> {
        let mut timer = lock(&self.timer);
        if timer.is_some() {
            return Err(TickerError::AlreadyStarted);
        }
        validate_interval(interval)?;
        let locator = self.shared.kind.locator(category)?;

        {
            let mut settings = lock(&self.shared.settings);
            if settings.locator != locator {
                settings.force = true;
            }
            settings.category = category;
            settings.locator = locator;
            settings.interval = interval;
        }
        self.shared.started.store(true, Ordering::Release);

        let shared = self.shared.clone();
        *timer = Some(RefreshTimer::arm(interval, KICKOFF_DELAY, move || {
            tokio::spawn(shared.clone().tick());
        }));

        info!(
            "Refreshing {} every {:?} (category {})",
            self.shared.kind.name(),
            interval,
            category
        );
        Ok(())
    }

    /// Disarm the timer and cancel the cycle in flight, if any. The service
    /// can be started again afterwards.
    pub fn stop_refreshing(&self) {
        let timer = lock(&self.timer).take();
        self.shared.started.store(false, Ordering::Release);
        self.shared.cancel_in_flight();

        if timer.is_some() {
            info!("Stopped refreshing {}", self.shared.kind.name());
        }
    }

    /// Ticks keep firing but do nothing. A cycle in flight runs to completion.
    pub fn pause_refreshing(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    pub fn resume_refreshing(&self) {
        self.shared.paused.store(false, Ordering::Release);
    }

    /// Wait in the background for the cycle in flight to finish, then move
    /// the next tick to [`KICKOFF_DELAY`] from now. The period is unchanged.
    pub fn immediate_refresh(&self) -> Result<()> {
        let handle = lock(&self.timer)
            .as_ref()
            .map(RefreshTimer::handle)
            .ok_or(TickerError::NotStarted)?;

        let shared = self.shared.clone();
        tokio::spawn(async move {
            while shared.running.load(Ordering::Acquire) {
                tokio::time::sleep(IDLE_POLL).await;
            }
            handle.fire_in(KICKOFF_DELAY);
        });
        Ok(())
    }

    /// Switch sub-feed. Same category is a no-op; an armed service refreshes
    /// right away, bypassing any "nothing changed" shortcut.
    pub fn change_content_category(&self, category: usize) -> Result<()> {
        let locator = self.shared.kind.locator(category)?;
        {
            let mut settings = lock(&self.shared.settings);
            if settings.category == category {
                return Ok(());
            }
            settings.category = category;
            settings.locator = locator;
            settings.force = true;
        }
        info!("{} category changed to {}", self.shared.kind.name(), category);

        if self.is_started() {
            self.immediate_refresh()?;
        }
        Ok(())
    }

    /// Reprogram the timer period. A cycle in flight is not affected.
    pub fn change_desired_refresh_interval(&self, interval: Duration) -> Result<()> {
        validate_interval(interval)?;
        {
            let mut settings = lock(&self.shared.settings);
            if settings.interval == interval {
                return Ok(());
            }
            settings.interval = interval;
        }

        if let Some(timer) = lock(&self.timer).as_ref() {
            timer.set_period(interval);
        }
        Ok(())
    }

    /// Run one cycle now, outside the timer. Works while paused or stopped.
    /// `None` if a cycle was already in flight.
    pub async fn refresh_now(&self) -> Option<bool> {
        self.shared.run_guarded(true).await
    }

    pub fn change_logging(&self, enabled: bool) {
        self.shared.log_switch.set_enabled(enabled);
    }

    pub fn logging_enabled(&self) -> bool {
        self.shared.log_switch.is_enabled()
    }
}

impl Drop for TickerService {
    fn drop(&mut self) {
        self.stop_refreshing();
    }
}
