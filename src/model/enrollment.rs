use serde_with::{serde_as, DefaultOnNull};

use super::*;

/// Share of a topic's duration that must be watched before it counts as watched.
pub const WATCHED_THRESHOLD_PERCENT: f64 = 80.0;

/// Aggregate watched percentage at which the exam unlocks.
pub const EXAM_THRESHOLD_PERCENT: u8 = 80;

/// A learner's registration in a stream, as returned by `GET /enrollments/my-enrollments`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(rename = "_id")]
    pub id: EnrollmentId,
    pub stream: Stream,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub total_watched_percentage: f64,
    /// Aggregate duration of every topic in the stream, in seconds.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub total_course_duration: f64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub topic_progress: Vec<TopicProgress>,
    #[serde(default)]
    pub exam_unlocked: bool,
}

impl Enrollment {
    pub fn course(&self, course_id: &CourseId) -> Option<&Course> {
        self.stream.courses.iter().find(|course| &course.id == course_id)
    }

    pub fn topic(&self, course_id: &CourseId, topic_name: &str) -> Option<&Topic> {
        self.course(course_id)?
            .topics
            .iter()
            .find(|topic| topic.name == topic_name)
    }

    pub fn topic_duration(&self, course_id: &CourseId, topic_name: &str) -> Option<f64> {
        self.topic(course_id, topic_name).map(|topic| topic.duration)
    }

    pub fn progress(&self, course_id: &CourseId, topic_name: &str) -> Option<&TopicProgress> {
        self.topic_progress
            .iter()
            .find(|row| &row.course_id == course_id && row.topic_name == topic_name)
    }

    pub fn contains_course(&self, course_id: &CourseId) -> bool {
        self.course(course_id).is_some()
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub courses: Vec<Course>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: CourseId,
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub topics: Vec<Topic>,
}

/// The addressable unit of video content within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub name: String,
    /// Length of the topic's video in seconds.
    #[serde(default, alias = "durationSeconds")]
    pub duration: f64,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl Topic {
    pub fn video_source(&self) -> Result<VideoSource, VideoSourceError> {
        let link = self.video_url.as_deref().unwrap_or_default();
        VideoSource::parse(link)
    }
}

/// One row per (course, topic) recording how much of it the learner has watched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    pub course_id: CourseId,
    pub topic_name: String,
    #[serde(default)]
    pub watched: bool,
    #[serde(default)]
    pub watched_duration: f64,
    #[serde(default)]
    pub last_watched_at: Option<Timestamp>,
}

impl TopicProgress {
    pub fn key(&self) -> TopicKey {
        TopicKey::new(self.course_id.clone(), self.topic_name.clone())
    }

    pub fn matches(&self, key: &TopicKey) -> bool {
        self.course_id == key.course_id && self.topic_name == key.topic_name
    }
}

/// Returns whether `watched` seconds of a `duration` second topic reach the watched threshold.
pub fn meets_watched_threshold(watched: f64, duration: f64) -> bool {
    duration > 0.0 && watched * 100.0 >= duration * WATCHED_THRESHOLD_PERCENT
}

/// An exam listed by `GET /exams/available`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub course_id: Option<String>,
}

/// Derived eligibility state, re-evaluated after every successful reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eligibility {
    pub watched_percentage: u8,
    pub exam_unlocked: bool,
    pub available_exams: Vec<Exam>,
}

/// Body of the topic progress update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgressUpdate {
    pub course_id: CourseId,
    pub topic_name: String,
    pub watched_duration: f64,
    pub total_course_duration: f64,
    pub total_watched_percentage: u8,
}
