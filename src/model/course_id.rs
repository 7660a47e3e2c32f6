use snafu::Snafu;

use super::*;

/// Canonical identifier of a course in the progress store (a 24 digit hex object id).
///
/// UI-local numeric ids do not parse, so they can never be sent as part of a progress update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseId(String);

impl CourseId {
    const LENGTH: usize = 24;
}

impl std::str::FromStr for CourseId {
    type Err = ParseCourseId;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let is_object_id =
            input.len() == Self::LENGTH && input.chars().all(|c| c.is_ascii_hexdigit());

        if !is_object_id {
            return Err(ParseCourseId::new(input.to_string()));
        }

        Ok(CourseId(input.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for CourseId {
    type Error = ParseCourseId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CourseId> for String {
    fn from(value: CourseId) -> Self {
        value.0
    }
}

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CourseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu, new)]
#[snafu(display("`{text}` is not a canonical course id"))]
pub struct ParseCourseId {
    pub text: String,
}

/// Identifier of an enrollment record. The store owns its format so it is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From)]
#[serde(transparent)]
pub struct EnrollmentId(pub String);

impl std::fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addresses one topic's progress row: (course, topic name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicKey {
    pub course_id: CourseId,
    pub topic_name: String,
}

impl TopicKey {
    pub fn new(course_id: CourseId, topic_name: impl Into<String>) -> Self {
        Self {
            course_id,
            topic_name: topic_name.into(),
        }
    }
}

impl std::fmt::Display for TopicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.course_id, self.topic_name)
    }
}
