//! C9 Scheduler — a single periodic task that scans due events and executes
//! `unlock_lesson`, `send_email`, `overview_statistics` (§4.8).
//!
//! Grounded on `skynet-scheduler::engine::SchedulerEngine`'s tick loop shape
//! (a `tokio::select!` between a fixed-interval timer and a shutdown
//! watch-channel) but driven off the §6 `EventStore`/`LessonStore`/
//! `MetricsStore`/`Mailer` collaborator traits instead of a generic SQLite
//! `jobs` table — this engine has exactly three event kinds, not an open
//! schedule DSL.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use classroom_core::collaborators::{
    EventKind, EventRecord, EventStore, LessonStore, Mail, Mailer, MetricsStore,
};

use crate::clock::Clock;
use crate::error::{Result, SchedulerError};
use crate::schedule::next_midnight_plus_one_minute;
use crate::types::UnlockLessonData;

/// Collaborators the engine needs to do its work — bundled so `run`/`tick`
/// don't need five separate `Arc` parameters threaded through.
pub struct SchedulerEngine {
    lessons: Arc<dyn LessonStore>,
    events: Arc<dyn EventStore>,
    metrics: Arc<dyn MetricsStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    interval_secs: u64,
}

impl SchedulerEngine {
    pub fn new(
        lessons: Arc<dyn LessonStore>,
        events: Arc<dyn EventStore>,
        metrics: Arc<dyn MetricsStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        interval_secs: u64,
    ) -> Self {
        Self {
            lessons,
            events,
            metrics,
            mailer,
            clock,
            interval_secs,
        }
    }

    /// Main loop. Polls every `interval_secs` until `shutdown` broadcasts
    /// `true`. One tick never overlaps the next — `tick` is awaited to
    /// completion before the loop selects again.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("event scheduler started");
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(self.interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("event scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Select events with `time < now ∧ done = false` and process them
    /// serially (§4.8). A failure in one event is logged and does not stop
    /// the rest of the batch.
    pub async fn tick(&self) -> Result<()> {
        let now = self.clock.now();
        let due = self.events.query_due_events(now).await?;
        if due.is_empty() {
            return Ok(());
        }
        info!(count = due.len(), "processing due scheduled events");
        for event in due {
            self.process_event(event, now).await;
        }
        Ok(())
    }

    /// Process one due event, marking it `done` exactly once regardless of
    /// outcome — the scheduler never retries; downstream systems own their
    /// own retries (§7, §8 property 8).
    async fn process_event(&self, event: EventRecord, now: chrono::DateTime<Utc>) {
        let event_id = event.id.clone();
        let outcome = match event.kind {
            EventKind::UnlockLesson => self.handle_unlock_lesson(&event).await,
            EventKind::SendEmail => self.handle_send_email(&event).await,
            EventKind::OverviewStatistics => self.handle_overview_statistics(&event, now).await,
        };

        if let Err(e) = outcome {
            error!(event_id = %event_id, kind = ?event.kind, "scheduled event failed: {e}");
        }

        if let Err(e) = self.events.mark_done(&event_id).await {
            error!(event_id = %event_id, "failed to mark scheduled event done: {e}");
        }
    }

    async fn handle_unlock_lesson(&self, event: &EventRecord) -> Result<()> {
        let data: UnlockLessonData = serde_json::from_value(event.data.clone())
            .map_err(|e| SchedulerError::InvalidPayload(e.to_string()))?;

        let Some(lesson) = self
            .lessons
            .find_lesson(&data.namespace_name, &data.lesson_name)
            .await?
        else {
            warn!(
                namespace = %data.namespace_name,
                lesson = %data.lesson_name,
                "unlock_lesson: lesson not found, treating as no-op"
            );
            return Ok(());
        };

        self.lessons.set_lesson_active(&lesson.id, true).await?;
        self.lessons.clear_lock_until(&lesson.id).await?;
        info!(lesson_id = %lesson.id, "lesson unlocked by scheduler");
        Ok(())
    }

    /// Mail delivery is fire-and-forget; the mail layer owns retries (§1
    /// Non-goals, §7 mail-failure) — a send error is logged here and never
    /// propagated back into the tick loop.
    async fn handle_send_email(&self, event: &EventRecord) -> Result<()> {
        let mail: Mail = serde_json::from_value(event.data.clone())
            .map_err(|e| SchedulerError::InvalidPayload(e.to_string()))?;
        let to = mail.to.clone();
        if let Err(e) = self.mailer.send(mail).await {
            warn!(event_id = %event.id, to = %to, "mail-failure: {e}");
        }
        Ok(())
    }

    async fn handle_overview_statistics(
        &self,
        event: &EventRecord,
        now: chrono::DateTime<Utc>,
    ) -> Result<()> {
        let (active_last_hour, active_last_day, active_last_week, active_last_month) =
            self.metrics.active_user_counts(now).await?;

        let row = classroom_core::collaborators::OverviewStatisticsRow {
            taken_at: now,
            user_count: self.metrics.count_users().await?,
            instructor_count: self.metrics.count_instructors().await?,
            lesson_count: self.metrics.count_lessons().await?,
            cohort_count: self.metrics.count_cohorts().await?,
            namespace_count: self.metrics.count_namespaces().await?,
            event_count: self.metrics.count_events().await?,
            file_count: self.metrics.count_files().await?,
            ticket_count: self.metrics.count_tickets().await?,
            active_last_hour,
            active_last_day,
            active_last_week,
            active_last_month,
            action_type_counts: self.metrics.aggregate_action_types().await?,
            total_spent_time_secs: self.metrics.total_spent_time_secs().await?,
        };

        self.metrics.insert_overview_statistics(&row).await?;
        info!(user_count = row.user_count, "overview statistics snapshot recorded");

        // Enqueue the follow-up run timed to one minute after next midnight
        // (§4.8) — the scheduler reschedules its own recurring events rather
        // than relying on a cron-style repeat field.
        let follow_up = EventRecord {
            id: Uuid::new_v4().to_string(),
            kind: EventKind::OverviewStatistics,
            time: next_midnight_plus_one_minute(now),
            data: serde_json::Value::Null,
            done: false,
            user: event.user.clone(),
        };
        self.events.insert(&follow_up).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::FixedClock;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use classroom_core::collaborators::{ActionTypeCounts, LessonRecord};
    use classroom_core::Result as CoreResult;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeLessons {
        lessons: StdMutex<Vec<LessonRecord>>,
    }

    #[async_trait]
    impl LessonStore for FakeLessons {
        async fn find_lesson(&self, namespace_title: &str, lesson_title: &str) -> CoreResult<Option<LessonRecord>> {
            Ok(self
                .lessons
                .lock()
                .unwrap()
                .iter()
                .find(|l| l.namespace_id == namespace_title && l.title == lesson_title)
                .cloned())
        }

        async fn set_lesson_active(&self, id: &str, active: bool) -> CoreResult<()> {
            for lesson in self.lessons.lock().unwrap().iter_mut() {
                if lesson.id == id {
                    lesson.active = active;
                }
            }
            Ok(())
        }

        async fn clear_lock_until(&self, id: &str) -> CoreResult<()> {
            for lesson in self.lessons.lock().unwrap().iter_mut() {
                if lesson.id == id {
                    lesson.lock_until = None;
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeEvents {
        events: StdMutex<Vec<EventRecord>>,
    }

    #[async_trait]
    impl EventStore for FakeEvents {
        async fn query_due_events(&self, now: chrono::DateTime<Utc>) -> CoreResult<Vec<EventRecord>> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| !e.done && e.time < now)
                .cloned()
                .collect())
        }

        async fn mark_done(&self, event_id: &str) -> CoreResult<()> {
            for event in self.events.lock().unwrap().iter_mut() {
                if event.id == event_id {
                    event.done = true;
                }
            }
            Ok(())
        }

        async fn insert(&self, event: &EventRecord) -> CoreResult<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct NoopMetrics;

    #[async_trait]
    impl MetricsStore for NoopMetrics {
        async fn count_users(&self) -> CoreResult<u64> {
            Ok(0)
        }
        async fn count_instructors(&self) -> CoreResult<u64> {
            Ok(0)
        }
        async fn count_lessons(&self) -> CoreResult<u64> {
            Ok(0)
        }
        async fn count_cohorts(&self) -> CoreResult<u64> {
            Ok(0)
        }
        async fn count_namespaces(&self) -> CoreResult<u64> {
            Ok(0)
        }
        async fn count_events(&self) -> CoreResult<u64> {
            Ok(0)
        }
        async fn count_files(&self) -> CoreResult<u64> {
            Ok(0)
        }
        async fn count_tickets(&self) -> CoreResult<u64> {
            Ok(0)
        }
        async fn active_user_counts(&self, _now: chrono::DateTime<Utc>) -> CoreResult<(u64, u64, u64, u64)> {
            Ok((0, 0, 0, 0))
        }
        async fn aggregate_action_types(&self) -> CoreResult<ActionTypeCounts> {
            Ok(ActionTypeCounts::default())
        }
        async fn total_spent_time_secs(&self) -> CoreResult<u64> {
            Ok(0)
        }
        async fn insert_overview_statistics(
            &self,
            _row: &classroom_core::collaborators::OverviewStatisticsRow,
        ) -> CoreResult<()> {
            Ok(())
        }
    }

    struct NoopMailer;

    #[async_trait]
    impl Mailer for NoopMailer {
        async fn send(&self, _mail: Mail) -> CoreResult<()> {
            Ok(())
        }
    }

    fn engine(lessons: Arc<FakeLessons>, events: Arc<FakeEvents>, clock: Arc<FixedClock>) -> SchedulerEngine {
        SchedulerEngine::new(lessons, events, Arc::new(NoopMetrics), Arc::new(NoopMailer), clock, 60)
    }

    #[tokio::test]
    async fn unlock_lesson_activates_and_clears_lock_then_marks_done() {
        let t0 = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let lessons = Arc::new(FakeLessons::default());
        lessons.lessons.lock().unwrap().push(LessonRecord {
            id: "lesson-1".into(),
            namespace_id: "N".into(),
            title: "L".into(),
            active: false,
            lock_until: Some(t0),
        });
        let events = Arc::new(FakeEvents::default());
        events.events.lock().unwrap().push(EventRecord {
            id: "evt-1".into(),
            kind: EventKind::UnlockLesson,
            time: t0 + chrono::Duration::seconds(60),
            data: serde_json::json!({ "namespaceName": "N", "lessonName": "L" }),
            done: false,
            user: None,
        });

        let clock = Arc::new(FixedClock::new(t0 + chrono::Duration::seconds(61)));
        let sched = engine(lessons.clone(), events.clone(), clock);
        sched.tick().await.unwrap();

        let lesson = lessons.lessons.lock().unwrap()[0].clone();
        assert!(lesson.active);
        assert!(lesson.lock_until.is_none());
        assert!(events.events.lock().unwrap()[0].done);
    }

    #[tokio::test]
    async fn second_tick_does_not_reprocess_a_done_event() {
        let t0 = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let lessons = Arc::new(FakeLessons::default());
        lessons.lessons.lock().unwrap().push(LessonRecord {
            id: "lesson-1".into(),
            namespace_id: "N".into(),
            title: "L".into(),
            active: false,
            lock_until: None,
        });
        let events = Arc::new(FakeEvents::default());
        events.events.lock().unwrap().push(EventRecord {
            id: "evt-1".into(),
            kind: EventKind::UnlockLesson,
            time: t0,
            data: serde_json::json!({ "namespaceName": "N", "lessonName": "L" }),
            done: false,
            user: None,
        });

        let clock = Arc::new(FixedClock::new(t0 + chrono::Duration::seconds(61)));
        let sched = engine(lessons.clone(), events.clone(), clock.clone());
        sched.tick().await.unwrap();
        assert!(events.events.lock().unwrap()[0].done);

        lessons.lessons.lock().unwrap()[0].active = false;
        clock.advance(chrono::Duration::seconds(60));
        sched.tick().await.unwrap();
        assert!(
            !lessons.lessons.lock().unwrap()[0].active,
            "a done event must not be reprocessed on the next tick"
        );
    }

    #[tokio::test]
    async fn overview_statistics_enqueues_a_follow_up_event() {
        let t0 = Utc.with_ymd_and_hms(2026, 7, 28, 23, 0, 0).unwrap();
        let lessons = Arc::new(FakeLessons::default());
        let events = Arc::new(FakeEvents::default());
        events.events.lock().unwrap().push(EventRecord {
            id: "evt-stats".into(),
            kind: EventKind::OverviewStatistics,
            time: t0,
            data: serde_json::Value::Null,
            done: false,
            user: None,
        });

        let clock = Arc::new(FixedClock::new(t0 + chrono::Duration::seconds(1)));
        let sched = engine(lessons, events.clone(), clock);
        sched.tick().await.unwrap();

        let all = events.events.lock().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].done);
        assert!(!all[1].done);
        assert_eq!(all[1].kind, EventKind::OverviewStatistics);
        assert_eq!(all[1].time, next_midnight_plus_one_minute(t0 + chrono::Duration::seconds(1)));
    }
}
