//! In-memory copy of what the progress store has acknowledged.
//!
//! The cache has exactly one writer, [ProgressCache], owned by the reconciler. Everything else
//! reads through [CacheReader] handles, which see whole snapshots and never a half-applied merge.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{
    meets_watched_threshold, CourseId, Eligibility, Enrollment, Timestamp, TopicKey,
    TopicProgress, EXAM_THRESHOLD_PERCENT,
};

/// Watched seconds that have been sent but not yet confirmed, keyed by topic.
pub type Overrides = HashMap<TopicKey, f64>;

impl Enrollment {
    /// Last acknowledged watched duration of a topic, `0` when it was never watched.
    pub fn previous_watched(&self, course_id: &CourseId, topic_name: &str) -> f64 {
        self.progress(course_id, topic_name)
            .map_or(0.0, |row| row.watched_duration.max(0.0))
    }

    /// Sum of watched seconds across every topic, with `overrides` taking precedence over the
    /// acknowledged rows. Overrides for topics without a row yet are counted too.
    pub fn total_watched_seconds(&self, overrides: Option<&Overrides>) -> f64 {
        let empty = Overrides::new();
        let overrides = overrides.unwrap_or(&empty);

        let acknowledged: f64 = self
            .topic_progress
            .iter()
            .map(|row| {
                overrides
                    .get(&row.key())
                    .copied()
                    .unwrap_or(row.watched_duration)
                    .max(0.0)
            })
            .sum();

        let pending: f64 = overrides
            .iter()
            .filter(|(key, _)| !self.topic_progress.iter().any(|row| row.matches(key)))
            .map(|(_, seconds)| seconds.max(0.0))
            .sum();

        acknowledged + pending
    }

    /// Rounded share of the course watched, in `0..=100`.
    ///
    /// Returns `0` while the total course duration is unknown.
    pub fn total_watched_percentage(&self, overrides: Option<&Overrides>) -> u8 {
        let duration = self.total_course_duration;
        if !duration.is_finite() || duration <= 0.0 {
            return 0;
        }

        let percentage = self.total_watched_seconds(overrides) / duration * 100.0;
        percentage.round().clamp(0.0, 100.0) as u8
    }

    pub fn is_topic_watched(&self, course_id: &CourseId, topic_name: &str) -> bool {
        let Some(duration) = self.topic_duration(course_id, topic_name) else {
            return false;
        };

        meets_watched_threshold(self.previous_watched(course_id, topic_name), duration)
    }

    /// Position a new playback session should seek to, kept inside `[0, topic duration]`.
    pub fn resume_position(&self, course_id: &CourseId, topic_name: &str) -> f64 {
        let previous = self.previous_watched(course_id, topic_name);

        match self.topic_duration(course_id, topic_name) {
            Some(duration) if duration > 0.0 => previous.clamp(0.0, duration),
            Some(_) => 0.0,
            None => previous,
        }
    }

    pub fn eligibility(&self) -> Eligibility {
        let watched_percentage = self.total_watched_percentage(None);

        Eligibility {
            watched_percentage,
            exam_unlocked: watched_percentage >= EXAM_THRESHOLD_PERCENT,
            available_exams: Vec::new(),
        }
    }

    /// Re-derive the `watched` flags, the aggregate percentage and the exam flag from the rows.
    fn normalize(mut self) -> Self {
        let durations: HashMap<TopicKey, f64> = self
            .stream
            .courses
            .iter()
            .flat_map(|course| {
                course
                    .topics
                    .iter()
                    .map(move |topic| {
                        (TopicKey::new(course.id.clone(), topic.name.clone()), topic.duration)
                    })
            })
            .collect();

        for row in &mut self.topic_progress {
            if let Some(duration) = durations.get(&row.key()) {
                row.watched = meets_watched_threshold(row.watched_duration, *duration);
            }
        }

        let eligibility = self.eligibility();
        self.total_watched_percentage = f64::from(eligibility.watched_percentage);
        self.exam_unlocked = eligibility.exam_unlocked;
        self
    }
}

/// Write side of the cache.
#[derive(Debug)]
pub struct ProgressCache {
    tx: watch::Sender<Arc<Enrollment>>,
}

impl ProgressCache {
    pub fn new(enrollment: Enrollment) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(enrollment.normalize()));
        Self { tx }
    }

    pub fn reader(&self) -> CacheReader {
        CacheReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> Arc<Enrollment> {
        self.tx.borrow().clone()
    }

    /// Swap in a freshly fetched enrollment, discarding the previous snapshot entirely.
    pub fn replace(&self, enrollment: Enrollment) {
        self.tx.send_replace(Arc::new(enrollment.normalize()));
    }

    /// Update a single topic row in place. The stored duration never decreases.
    pub fn patch_topic(&self, key: &TopicKey, watched_duration: f64, at: Timestamp) {
        self.tx.send_modify(|snapshot| {
            let mut enrollment = Enrollment::clone(snapshot);

            match enrollment.topic_progress.iter_mut().find(|row| row.matches(key)) {
                Some(row) => {
                    row.watched_duration = row.watched_duration.max(watched_duration);
                    row.last_watched_at = Some(at);
                }
                None => enrollment.topic_progress.push(TopicProgress {
                    course_id: key.course_id.clone(),
                    topic_name: key.topic_name.clone(),
                    watched: false,
                    watched_duration: watched_duration.max(0.0),
                    last_watched_at: Some(at),
                }),
            }

            *snapshot = Arc::new(enrollment.normalize());
        });
    }
}

/// Read side of the cache, cheap to clone and hand to sessions or the UI.
#[derive(Debug, Clone)]
pub struct CacheReader {
    rx: watch::Receiver<Arc<Enrollment>>,
}

impl CacheReader {
    pub fn snapshot(&self) -> Arc<Enrollment> {
        self.rx.borrow().clone()
    }

    pub fn previous_watched(&self, course_id: &CourseId, topic_name: &str) -> f64 {
        self.rx.borrow().previous_watched(course_id, topic_name)
    }

    pub fn total_watched_seconds(&self, overrides: Option<&Overrides>) -> f64 {
        self.rx.borrow().total_watched_seconds(overrides)
    }

    pub fn total_watched_percentage(&self, overrides: Option<&Overrides>) -> u8 {
        self.rx.borrow().total_watched_percentage(overrides)
    }

    pub fn resume_position(&self, course_id: &CourseId, topic_name: &str) -> f64 {
        self.rx.borrow().resume_position(course_id, topic_name)
    }

    /// Wait until the writer publishes a new snapshot. Returns `false` once the writer is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{now, Course, EnrollmentId, Stream, Topic};

    pub const COURSE: &str = "65f1a2b3c4d5e6f7a8b9c0d1";

    pub fn course_id() -> CourseId {
        COURSE.parse().unwrap()
    }

    pub fn row(topic_name: &str, watched_duration: f64) -> TopicProgress {
        TopicProgress {
            course_id: course_id(),
            topic_name: topic_name.to_string(),
            watched: false,
            watched_duration,
            last_watched_at: None,
        }
    }

    /// Topic A is 600s long, topic B 300s, for a 900s course.
    pub fn enrollment(rows: Vec<TopicProgress>) -> Enrollment {
        Enrollment {
            id: EnrollmentId("enr-1".to_string()),
            stream: Stream {
                id: "stream-1".to_string(),
                name: "Systems".to_string(),
                courses: vec![Course {
                    id: course_id(),
                    title: "Rust".to_string(),
                    topics: vec![
                        Topic {
                            name: "A".to_string(),
                            duration: 600.0,
                            video_url: Some("https://youtu.be/dQw4w9WgXcQ".to_string()),
                        },
                        Topic {
                            name: "B".to_string(),
                            duration: 300.0,
                            video_url: None,
                        },
                    ],
                }],
            },
            total_watched_percentage: 0.0,
            total_course_duration: 900.0,
            topic_progress: rows,
            exam_unlocked: false,
        }
    }

    #[test]
    fn previous_watched_defaults_to_zero() {
        let enrollment = enrollment(vec![row("A", 42.0)]);
        assert_eq!(enrollment.previous_watched(&course_id(), "A"), 42.0);
        assert_eq!(enrollment.previous_watched(&course_id(), "B"), 0.0);
    }

    #[test]
    fn percentage_is_rounded() {
        let enrollment = enrollment(vec![row("A", 600.0), row("B", 0.0)]);
        assert_eq!(enrollment.total_watched_percentage(None), 67);
    }

    #[test]
    fn overrides_replace_and_extend_rows() {
        let enrollment = enrollment(vec![row("A", 100.0)]);
        let overrides = Overrides::from([
            (TopicKey::new(course_id(), "A"), 300.0),
            (TopicKey::new(course_id(), "B"), 150.0),
        ]);

        assert_eq!(enrollment.total_watched_seconds(Some(&overrides)), 450.0);
        assert_eq!(enrollment.total_watched_percentage(Some(&overrides)), 50);
        assert_eq!(enrollment.total_watched_seconds(None), 100.0);
    }

    #[test]
    fn unknown_duration_yields_zero_percent() {
        let mut enrollment = enrollment(vec![row("A", 600.0)]);

        enrollment.total_course_duration = 0.0;
        assert_eq!(enrollment.total_watched_percentage(None), 0);

        enrollment.total_course_duration = f64::NAN;
        assert_eq!(enrollment.total_watched_percentage(None), 0);
    }

    #[test]
    fn percentage_never_exceeds_hundred() {
        let enrollment = enrollment(vec![row("A", 600.0), row("B", 900.0)]);
        assert_eq!(enrollment.total_watched_percentage(None), 100);
    }

    #[test]
    fn watched_threshold_crossing() {
        let at_threshold = enrollment(vec![row("A", 480.0)]);
        let below_threshold = enrollment(vec![row("A", 479.0)]);

        assert!(at_threshold.is_topic_watched(&course_id(), "A"));
        assert!(!below_threshold.is_topic_watched(&course_id(), "A"));
    }

    #[test]
    fn resume_position_is_clamped() {
        let corrupted = enrollment(vec![row("A", 5000.0), row("B", -20.0)]);

        assert_eq!(corrupted.resume_position(&course_id(), "A"), 600.0);
        assert_eq!(corrupted.resume_position(&course_id(), "B"), 0.0);
    }

    #[test]
    fn replace_normalizes_derived_fields() {
        let cache = ProgressCache::new(enrollment(vec![]));
        cache.replace(enrollment(vec![row("A", 600.0), row("B", 240.0)]));

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.total_watched_percentage, 93.0);
        assert!(snapshot.exam_unlocked);
        assert!(snapshot.topic_progress.iter().all(|row| row.watched));
    }

    #[test]
    fn patch_topic_never_decreases() {
        let cache = ProgressCache::new(enrollment(vec![row("A", 300.0)]));
        let key = TopicKey::new(course_id(), "A");

        cache.patch_topic(&key, 120.0, now());
        assert_eq!(cache.snapshot().previous_watched(&course_id(), "A"), 300.0);

        cache.patch_topic(&key, 500.0, now());
        assert_eq!(cache.snapshot().previous_watched(&course_id(), "A"), 500.0);
        assert!(cache.snapshot().is_topic_watched(&course_id(), "A"));
    }

    #[test]
    fn patch_topic_creates_missing_rows() {
        let cache = ProgressCache::new(enrollment(vec![]));
        cache.patch_topic(&TopicKey::new(course_id(), "B"), 30.0, now());

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.topic_progress.len(), 1);
        assert_eq!(snapshot.previous_watched(&course_id(), "B"), 30.0);
    }

    #[tokio::test]
    async fn readers_observe_writes() {
        let cache = ProgressCache::new(enrollment(vec![]));
        let mut reader = cache.reader();

        cache.patch_topic(&TopicKey::new(course_id(), "A"), 60.0, now());

        assert!(reader.changed().await);
        assert_eq!(reader.previous_watched(&course_id(), "A"), 60.0);
        assert_eq!(reader.total_watched_seconds(None), 60.0);
    }
}
