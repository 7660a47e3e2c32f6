use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::*;
use crate::model::{now, TopicProgress};

/// A [ProgressStore] that keeps everything in memory and trusts whatever the client sends.
#[derive(Debug, Default)]
pub struct MemoryStore {
    enrollments: Mutex<Vec<Enrollment>>,
    exams: Mutex<Vec<Exam>>,
    updates: Mutex<Vec<TopicProgressUpdate>>,
    pub fail_updates: AtomicBool,
    pub fail_fetches: AtomicBool,
    pub fail_exams: AtomicBool,
    pub reject_token: AtomicBool,
    /// Updates never answer while set.
    pub stall_updates: AtomicBool,
    pub stalled: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new(enrollments: Vec<Enrollment>) -> Self {
        Self {
            enrollments: Mutex::new(enrollments),
            ..Default::default()
        }
    }

    pub fn with_exams(self, exams: Vec<Exam>) -> Self {
        *self.exams.lock().unwrap() = exams;
        self
    }

    pub fn updates(&self) -> Vec<TopicProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn enrollment(&self, index: usize) -> Option<Enrollment> {
        self.enrollments.lock().unwrap().get(index).cloned()
    }

    fn check_token(&self, endpoint: &str) -> Result<()> {
        if self.reject_token.load(Ordering::SeqCst) {
            return AuthRequiredSnafu { endpoint }.fail();
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn my_enrollments(&self, _token: &AuthToken) -> Result<Vec<Enrollment>> {
        self.check_token("my-enrollments")?;
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.fail_fetches.load(Ordering::SeqCst) {
            return StatusSnafu {
                endpoint: "my-enrollments",
                status: 503u16,
            }
            .fail();
        }

        Ok(self.enrollments.lock().unwrap().clone())
    }

    async fn update_topic_progress(
        &self, _token: &AuthToken, update: &TopicProgressUpdate,
    ) -> Result<()> {
        self.check_token("topic-progress")?;

        if self.stall_updates.load(Ordering::SeqCst) {
            self.stalled.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
        }

        if self.fail_updates.load(Ordering::SeqCst) {
            return StatusSnafu {
                endpoint: "topic-progress",
                status: 502u16,
            }
            .fail();
        }

        self.updates.lock().unwrap().push(update.clone());

        let mut enrollments = self.enrollments.lock().unwrap();
        let Some(enrollment) = enrollments
            .iter_mut()
            .find(|enrollment| enrollment.contains_course(&update.course_id))
        else {
            return RejectedSnafu {
                endpoint: "topic-progress",
                message: "enrollment not found",
            }
            .fail();
        };

        let row = enrollment
            .topic_progress
            .iter_mut()
            .find(|row| row.course_id == update.course_id && row.topic_name == update.topic_name);

        match row {
            Some(row) => {
                row.watched_duration = update.watched_duration;
                row.last_watched_at = Some(now());
            }
            None => enrollment.topic_progress.push(TopicProgress {
                course_id: update.course_id.clone(),
                topic_name: update.topic_name.clone(),
                watched: false,
                watched_duration: update.watched_duration,
                last_watched_at: Some(now()),
            }),
        }
        enrollment.total_watched_percentage = f64::from(update.total_watched_percentage);

        Ok(())
    }

    async fn available_exams(&self, _token: &AuthToken) -> Result<Vec<Exam>> {
        self.check_token("exams")?;

        if self.fail_exams.load(Ordering::SeqCst) {
            return StatusSnafu {
                endpoint: "exams",
                status: 500u16,
            }
            .fail();
        }

        Ok(self.exams.lock().unwrap().clone())
    }
}
