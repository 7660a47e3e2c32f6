//! Pushes observed playback to the progress store and merges the answer back into the cache.

use std::sync::Arc;

use snafu::OptionExt as _;
use tokio::sync::watch;
use tracing::instrument;

use crate::model::{now, CourseId, Eligibility, Enrollment, EnrollmentId, TopicKey, TopicProgressUpdate};
use crate::service::cache::{CacheReader, Overrides, ProgressCache};
use crate::service::remote::{AuthToken, ProgressStore};

pub use error::*;

mod error;

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;

/// The only component that mutates the cached enrollment.
///
/// Merges are monotonic: the duration sent for a topic is never lower than what the store has
/// already acknowledged, so reconciliations resolving out of order cannot move progress backwards.
#[derive(Debug)]
pub struct Reconciler {
    store: Arc<dyn ProgressStore>,
    token: AuthToken,
    enrollment_id: EnrollmentId,
    cache: ProgressCache,
    eligibility: watch::Sender<Eligibility>,
}

impl Reconciler {
    /// Fetch the learner's enrollments and build a reconciler for one of them, the first one
    /// when `enrollment_id` is not given.
    #[instrument(skip(store, token))]
    pub async fn load(
        store: Arc<dyn ProgressStore>, token: AuthToken, enrollment_id: Option<EnrollmentId>,
    ) -> Result<Self> {
        let enrollments = store.my_enrollments(&token).await?;
        let enrollment = select_enrollment(enrollments, enrollment_id.as_ref())?;

        tracing::info!(
            enrollment_id = %enrollment.id,
            stream = %enrollment.stream.name,
            topics = enrollment.topic_progress.len(),
            "loaded enrollment `{}`", enrollment.id
        );

        let (eligibility, _) = watch::channel(Eligibility::default());
        let reconciler = Self {
            store,
            token,
            enrollment_id: enrollment.id.clone(),
            cache: ProgressCache::new(enrollment),
            eligibility,
        };
        reconciler.evaluate_eligibility().await;

        Ok(reconciler)
    }

    pub fn enrollment_id(&self) -> &EnrollmentId {
        &self.enrollment_id
    }

    pub fn reader(&self) -> CacheReader {
        self.cache.reader()
    }

    pub fn snapshot(&self) -> Arc<Enrollment> {
        self.cache.snapshot()
    }

    pub fn eligibility(&self) -> watch::Receiver<Eligibility> {
        self.eligibility.subscribe()
    }

    /// Re-fetch the enrollment and replace the cache with it.
    #[instrument(skip(self), fields(enrollment_id = %self.enrollment_id))]
    pub async fn refresh(&self) -> Result<Arc<Enrollment>> {
        let enrollment = self.fetch_enrollment().await?;
        self.cache.replace(enrollment);
        self.evaluate_eligibility().await;

        Ok(self.cache.snapshot())
    }

    /// Send `observed_seconds` of playback for a topic and merge the result into the cache.
    ///
    /// Failures are not retried here; the next reconciliation carries an equal or larger value.
    #[instrument(skip(self), fields(enrollment_id = %self.enrollment_id))]
    pub async fn reconcile(
        &self, course_id: &CourseId, topic_name: &str, observed_seconds: f64,
    ) -> Result<Arc<Enrollment>> {
        let snapshot = self.cache.snapshot();
        let duration = snapshot
            .topic_duration(course_id, topic_name)
            .context(UnknownTopicSnafu {
                course_id: course_id.clone(),
                topic_name,
            })?;

        let capped = observed_seconds.max(0.0).min(duration);
        let previous = snapshot.previous_watched(course_id, topic_name);
        let watched_duration = previous.max(capped);

        let key = TopicKey::new(course_id.clone(), topic_name);
        let overrides = Overrides::from([(key.clone(), watched_duration)]);
        let update = TopicProgressUpdate {
            course_id: course_id.clone(),
            topic_name: topic_name.to_string(),
            watched_duration,
            total_course_duration: snapshot.total_course_duration,
            total_watched_percentage: snapshot.total_watched_percentage(Some(&overrides)),
        };

        tracing::debug!(%key, observed_seconds, previous, watched_duration, "reconcile topic `{}`", key);

        if let Err(error) = self.store.update_topic_progress(&self.token, &update).await {
            tracing::error!(%key, %error, "could not send progress of `{}`: {}", key, error);
            return Err(error.into());
        }

        match self.fetch_enrollment().await {
            Ok(enrollment) => self.cache.replace(enrollment),
            Err(error) => {
                tracing::warn!(%key, %error, "could not confirm progress of `{}`, patching it locally", key);
                self.cache.patch_topic(&key, watched_duration, now());
            }
        }

        self.evaluate_eligibility().await;

        Ok(self.cache.snapshot())
    }

    /// Mark a topic as fully watched without waiting for the player to reach the end.
    pub async fn complete(&self, course_id: &CourseId, topic_name: &str) -> Result<Arc<Enrollment>> {
        let duration = self
            .cache
            .snapshot()
            .topic_duration(course_id, topic_name)
            .context(UnknownTopicSnafu {
                course_id: course_id.clone(),
                topic_name,
            })?;

        self.reconcile(course_id, topic_name, duration).await
    }

    async fn fetch_enrollment(&self) -> Result<Enrollment> {
        let enrollments = self.store.my_enrollments(&self.token).await?;
        select_enrollment(enrollments, Some(&self.enrollment_id))
    }

    /// Publish the eligibility derived from the current snapshot. Exams are looked up when the
    /// exam first unlocks; a failed lookup leaves the list empty.
    async fn evaluate_eligibility(&self) {
        let mut eligibility = self.cache.snapshot().eligibility();
        let previous = self.eligibility.borrow().clone();

        if eligibility.exam_unlocked && previous.exam_unlocked {
            eligibility.available_exams = previous.available_exams;
        } else if eligibility.exam_unlocked {
            tracing::info!(
                watched_percentage = eligibility.watched_percentage,
                "exam unlocked for enrollment `{}`", self.enrollment_id
            );

            match self.store.available_exams(&self.token).await {
                Ok(exams) => eligibility.available_exams = exams,
                Err(error) => tracing::warn!(%error, "could not fetch available exams: {}", error),
            }
        }

        self.eligibility.send_if_modified(|current| {
            let modified = *current != eligibility;
            *current = eligibility;
            modified
        });
    }
}

fn select_enrollment(
    enrollments: Vec<Enrollment>, enrollment_id: Option<&EnrollmentId>,
) -> Result<Enrollment> {
    match enrollment_id {
        Some(enrollment_id) => enrollments
            .into_iter()
            .find(|enrollment| &enrollment.id == enrollment_id)
            .context(EnrollmentNotFoundSnafu {
                enrollment_id: enrollment_id.clone(),
            }),
        None => enrollments.into_iter().next().context(NoEnrollmentsSnafu),
    }
}
