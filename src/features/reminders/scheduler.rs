//! # Reminder Scheduler
//!
//! Owns the recurring reminder timer. Each tick reads the current settings
//! and saved words from the store and, when allowed, notifies the user of
//! one random saved word.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Single idempotent `reconfigure` entry point, settings watcher
//! - 1.1.0: Hour-of-day window and configurable interval
//! - 1.0.0: Fixed 30 minute reminder loop

use anyhow::Result;
use log::{debug, error, info, warn};
use rand::seq::IndexedRandom;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::settings::ReminderSettings;
use super::window::{in_window, Clock};
use crate::core::collapse_whitespace;
use crate::features::notifications::{Notification, Notifier};
use crate::store::{SavedWord, Store, StoreChange, REMINDER_KEYS};

/// Body used when a saved word has no usable definition text
pub const FALLBACK_BODY: &str = "Time to review this word!";

/// What a single tick decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Disabled,
    NoWords,
    OutsideWindow { hour: u32 },
    Notified { word_id: i64 },
    /// Notification delivery failed; logged and swallowed
    NotifyFailed { word_id: i64 },
}

struct ArmedTimer {
    handle: JoinHandle<()>,
    period: Duration,
}

pub struct ReminderScheduler {
    store: Arc<Store>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    timer: Mutex<Option<ArmedTimer>>,
}

impl ReminderScheduler {
    pub fn new(store: Arc<Store>, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            store,
            notifier,
            clock,
            timer: Mutex::new(None),
        })
    }

    fn timer_slot(&self) -> MutexGuard<'_, Option<ArmedTimer>> {
        match self.timer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Replace the recurring timer to match `settings`.
    ///
    /// Any existing timer is cancelled first; when reminders are disabled no
    /// new timer is armed. Calling this repeatedly leaves at most one timer.
    pub fn reconfigure(self: &Arc<Self>, settings: &ReminderSettings) {
        let mut slot = self.timer_slot();

        if let Some(previous) = slot.take() {
            previous.handle.abort();
            debug!("Cancelled reminder timer ({:?})", previous.period);
        }

        if !settings.enabled {
            info!("Reminders disabled, timer cleared");
            return;
        }

        let period = settings.effective_interval();
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            scheduler.run_timer(period).await;
        });
        *slot = Some(ArmedTimer { handle, period });

        info!(
            "⏰ Reminder timer armed (every {} min, window {}-{})",
            period.as_secs() / 60,
            settings.window_start_hour,
            settings.window_end_hour
        );
    }

    /// Period of the armed timer, if any
    pub fn active_period(&self) -> Option<Duration> {
        self.timer_slot()
            .as_ref()
            .filter(|t| !t.handle.is_finished())
            .map(|t| t.period)
    }

    pub fn is_armed(&self) -> bool {
        self.active_period().is_some()
    }

    /// Cancel the timer without re-arming
    pub fn shutdown(&self) {
        if let Some(timer) = self.timer_slot().take() {
            timer.handle.abort();
            info!("Reminder timer stopped");
        }
    }

    async fn run_timer(self: Arc<Self>, period: Duration) {
        // First reminder fires one full period after arming
        let now = Instant::now();
        let Some(start) = now.checked_add(period) else {
            error!("Reminder period {period:?} cannot be scheduled");
            return;
        };
        let mut interval = interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.on_tick().await {
                error!("Reminder tick failed: {e}");
            }
        }
    }

    /// Run one tick: decide whether to notify, and do so
    pub async fn on_tick(&self) -> Result<TickOutcome> {
        let settings = self.store.reminder_settings().await?;
        if !settings.enabled {
            debug!("Tick skipped: reminders disabled");
            return Ok(TickOutcome::Disabled);
        }

        let words = self.store.list_words().await?;
        if words.is_empty() {
            debug!("Tick skipped: no saved words");
            return Ok(TickOutcome::NoWords);
        }

        let hour = self.clock.current_hour();
        if !in_window(settings.window_start_hour, settings.window_end_hour, hour) {
            debug!(
                "Tick skipped: hour {} outside window {}-{}",
                hour, settings.window_start_hour, settings.window_end_hour
            );
            return Ok(TickOutcome::OutsideWindow { hour });
        }

        let Some(chosen) = pick_random(&words) else {
            return Ok(TickOutcome::NoWords);
        };
        let word_id = chosen.id;
        let notification = build_notification(chosen);

        match self.notifier.notify(&notification).await {
            Ok(()) => {
                info!("Reminder shown for '{}' (#{})", chosen.word, word_id);
                Ok(TickOutcome::Notified { word_id })
            }
            Err(e) => {
                warn!("Failed to show reminder for '{}': {}", chosen.word, e);
                Ok(TickOutcome::NotifyFailed { word_id })
            }
        }
    }

    /// Run a tick immediately in the background and return without waiting
    pub fn trigger_now(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            match scheduler.on_tick().await {
                Ok(outcome) => debug!("Manual reminder: {outcome:?}"),
                Err(e) => error!("Manual reminder failed: {e}"),
            }
        })
    }

    /// Re-arm the timer whenever reminder settings change in the store
    pub fn watch_settings(self: &Arc<Self>, mut changes: broadcast::Receiver<StoreChange>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.touches_any(&REMINDER_KEYS) => {
                        scheduler.reload().await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Settings watcher lagged by {n} changes, reloading");
                        scheduler.reload().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Read settings from the store and reconfigure
    pub async fn reload(self: &Arc<Self>) {
        match self.store.reminder_settings().await {
            Ok(settings) => self.reconfigure(&settings),
            Err(e) => error!("Failed to read reminder settings: {e}"),
        }
    }
}

fn pick_random(words: &[SavedWord]) -> Option<&SavedWord> {
    words.choose(&mut rand::rng())
}

/// Title references the word; body is its best definition text
pub fn build_notification(word: &SavedWord) -> Notification {
    let body = word
        .meanings
        .reminder_text()
        .map(collapse_whitespace)
        .unwrap_or_else(|| FALLBACK_BODY.to_string());
    Notification::new(format!("Reminder: {}", word.word), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::dictionary::{DefinitionEntry, GroupedDefinitions};
    use crate::features::reminders::settings::MAX_INTERVAL_MINUTES;
    use crate::features::reminders::window::FixedClock;
    use crate::store::Meanings;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recording {
        shown: Mutex<Vec<Notification>>,
    }

    impl Recording {
        fn count(&self) -> usize {
            self.shown.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, notification: &Notification) -> Result<()> {
            self.shown.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Broken {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for Broken {
        async fn notify(&self, _notification: &Notification) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("no notification daemon"))
        }
    }

    fn grouped(entries: &[(&str, &str)]) -> Meanings {
        let mut g = GroupedDefinitions::new();
        for (pos, text) in entries {
            g.push(pos, DefinitionEntry::new(*text, None));
        }
        Meanings::Grouped(g)
    }

    async fn setup(
        settings: ReminderSettings,
        hour: u32,
    ) -> (Arc<Store>, Arc<Recording>, Arc<ReminderScheduler>) {
        let store = Arc::new(Store::in_memory().await.unwrap());
        store.set_reminder_settings(&settings).await.unwrap();
        let notifier = Arc::new(Recording::default());
        let scheduler =
            ReminderScheduler::new(store.clone(), notifier.clone(), Arc::new(FixedClock(hour)));
        (store, notifier, scheduler)
    }

    fn night_window() -> ReminderSettings {
        ReminderSettings {
            enabled: true,
            interval_minutes: 30,
            window_start_hour: 22,
            window_end_hour: 6,
        }
    }

    #[tokio::test]
    async fn test_empty_list_never_notifies() {
        for hour in [0, 12, 23] {
            let (_store, notifier, scheduler) = setup(ReminderSettings::default(), hour).await;
            assert_eq!(scheduler.on_tick().await.unwrap(), TickOutcome::NoWords);
            assert_eq!(notifier.count(), 0);
        }
    }

    #[tokio::test]
    async fn test_disabled_is_silent() {
        let settings = ReminderSettings {
            enabled: false,
            ..Default::default()
        };
        let (store, notifier, scheduler) = setup(settings, 12).await;
        store.add_word("run", &grouped(&[("verb", "to move")])).await.unwrap();

        assert_eq!(scheduler.on_tick().await.unwrap(), TickOutcome::Disabled);
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_wrapping_window_in_and_out() {
        let (store, notifier, late) = setup(night_window(), 23).await;
        let id = store.add_word("run", &grouped(&[("verb", "to move")])).await.unwrap();
        assert_eq!(late.on_tick().await.unwrap(), TickOutcome::Notified { word_id: id });
        assert_eq!(notifier.count(), 1);

        let noon = ReminderScheduler::new(store.clone(), notifier.clone(), Arc::new(FixedClock(12)));
        assert_eq!(
            noon.on_tick().await.unwrap(),
            TickOutcome::OutsideWindow { hour: 12 }
        );
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_notification_uses_first_available_definition() {
        let (store, notifier, scheduler) = setup(ReminderSettings::default(), 9).await;
        store
            .add_word("light", &grouped(&[("noun", "electromagnetic\n radiation"), ("verb", "to ignite")]))
            .await
            .unwrap();

        scheduler.on_tick().await.unwrap();
        let shown = notifier.shown.lock().unwrap();
        assert_eq!(shown[0].title, "Reminder: light");
        assert_eq!(shown[0].body, "electromagnetic radiation");
    }

    #[tokio::test]
    async fn test_fallback_body_without_definition_text() {
        let (store, notifier, scheduler) = setup(ReminderSettings::default(), 9).await;
        store.add_word("blank", &Meanings::Text("   ".into())).await.unwrap();

        scheduler.on_tick().await.unwrap();
        assert_eq!(notifier.shown.lock().unwrap()[0].body, FALLBACK_BODY);
    }

    #[tokio::test]
    async fn test_plain_text_meanings_used_as_body() {
        let (store, notifier, scheduler) = setup(ReminderSettings::default(), 9).await;
        store
            .add_word("old", &Meanings::Text("saved before grouping".into()))
            .await
            .unwrap();

        scheduler.on_tick().await.unwrap();
        assert_eq!(notifier.shown.lock().unwrap()[0].body, "saved before grouping");
    }

    #[tokio::test]
    async fn test_notify_failure_is_swallowed() {
        let store = Arc::new(Store::in_memory().await.unwrap());
        let id = store.add_word("run", &grouped(&[("verb", "to move")])).await.unwrap();
        let scheduler =
            ReminderScheduler::new(store, Arc::new(Broken::default()), Arc::new(FixedClock(10)));

        assert_eq!(
            scheduler.on_tick().await.unwrap(),
            TickOutcome::NotifyFailed { word_id: id }
        );
    }

    #[tokio::test]
    async fn test_random_pick_stays_within_list() {
        let (store, _notifier, scheduler) = setup(ReminderSettings::default(), 9).await;
        let a = store.add_word("a", &grouped(&[("noun", "x")])).await.unwrap();
        let b = store.add_word("b", &grouped(&[("noun", "y")])).await.unwrap();

        for _ in 0..20 {
            match scheduler.on_tick().await.unwrap() {
                TickOutcome::Notified { word_id } => assert!(word_id == a || word_id == b),
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_twice_keeps_one_timer() {
        let settings = ReminderSettings {
            interval_minutes: 1,
            ..Default::default()
        };
        let (store, notifier, scheduler) = setup(settings, 9).await;
        store.add_word("run", &grouped(&[("verb", "to move")])).await.unwrap();

        scheduler.reconfigure(&settings);
        scheduler.reconfigure(&settings);
        assert_eq!(scheduler.active_period(), Some(Duration::from_secs(60)));

        // Nothing fires before the first period elapses
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(notifier.count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(notifier.count(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(notifier.count(), 2);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_positive_interval_fires_every_minute() {
        let settings = ReminderSettings {
            interval_minutes: 0,
            ..Default::default()
        };
        let (store, notifier, scheduler) = setup(settings, 9).await;
        store.add_word("run", &grouped(&[("verb", "to move")])).await.unwrap();

        scheduler.reconfigure(&settings);
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(notifier.count(), 1);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_cancels_timer() {
        let (_store, _notifier, scheduler) = setup(ReminderSettings::default(), 9).await;
        scheduler.reconfigure(&ReminderSettings::default());
        assert!(scheduler.is_armed());

        scheduler.reconfigure(&ReminderSettings {
            enabled: false,
            ..Default::default()
        });
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_survives_failed_ticks() {
        let store = Arc::new(Store::in_memory().await.unwrap());
        store.add_word("run", &grouped(&[("verb", "to move")])).await.unwrap();
        let settings = ReminderSettings {
            interval_minutes: 1,
            ..Default::default()
        };
        let notifier = Arc::new(Broken::default());
        let scheduler = ReminderScheduler::new(store, notifier.clone(), Arc::new(FixedClock(10)));

        scheduler.reconfigure(&settings);
        tokio::time::sleep(Duration::from_secs(185)).await;
        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 3);
        assert!(scheduler.is_armed());
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_stored_interval_still_arms() {
        let (store, _notifier, scheduler) = setup(ReminderSettings::default(), 9).await;
        store
            .set_reminder_settings(&ReminderSettings {
                interval_minutes: i64::MAX,
                ..Default::default()
            })
            .await
            .unwrap();

        scheduler.reload().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            scheduler.active_period(),
            Some(Duration::from_secs(MAX_INTERVAL_MINUTES as u64 * 60))
        );

        // Unsanitized settings passed straight in are capped the same way
        scheduler.reconfigure(&ReminderSettings {
            interval_minutes: 200_000_000_000_000_000,
            ..Default::default()
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(scheduler.is_armed());
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_trigger_now_runs_without_timer() {
        let (store, notifier, scheduler) = setup(ReminderSettings::default(), 9).await;
        store.add_word("run", &grouped(&[("verb", "to move")])).await.unwrap();

        let handle = scheduler.trigger_now();
        assert!(!scheduler.is_armed());
        handle.await.unwrap();
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_change_rearms_timer() {
        let disabled = ReminderSettings {
            enabled: false,
            ..Default::default()
        };
        let (store, _notifier, scheduler) = setup(disabled, 9).await;
        let watcher = scheduler.watch_settings(store.subscribe());
        scheduler.reload().await;
        assert!(!scheduler.is_armed());

        store
            .set_reminder_settings(&ReminderSettings {
                interval_minutes: 5,
                ..Default::default()
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(scheduler.active_period(), Some(Duration::from_secs(300)));

        // Unrelated keys do not touch the timer
        store.add_word("run", &grouped(&[("verb", "to move")])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(scheduler.active_period(), Some(Duration::from_secs(300)));

        watcher.abort();
        scheduler.shutdown();
    }
}
