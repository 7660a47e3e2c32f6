//! The authoritative progress store the tracker reconciles against.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::model::{Enrollment, Exam, TopicProgressUpdate};

pub use error::*;
pub use http::HttpProgressStore;

mod error;
mod http;

#[cfg(test)]
pub(crate) mod memory;

/// Bearer token identifying the learner.
pub type AuthToken = SecretString;

#[async_trait]
pub trait ProgressStore: std::fmt::Debug + Send + Sync {
    /// Every enrollment of the learner, including topic progress and the course duration.
    async fn my_enrollments(&self, token: &AuthToken) -> Result<Vec<Enrollment>>;

    /// Record the watched duration of one topic together with the client computed percentage.
    async fn update_topic_progress(
        &self, token: &AuthToken, update: &TopicProgressUpdate,
    ) -> Result<()>;

    async fn available_exams(&self, token: &AuthToken) -> Result<Vec<Exam>>;
}
