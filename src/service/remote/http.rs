use reqwest::{RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use snafu::ResultExt;
use tracing::instrument;
use url::Url;

use super::*;

const MY_ENROLLMENTS: &str = "enrollments/my-enrollments";
const TOPIC_PROGRESS: &str = "enrollments/topic-progress";
const AVAILABLE_EXAMS: &str = "exams/available";

/// [ProgressStore] backed by the platform's REST api.
#[derive(Debug, Clone)]
pub struct HttpProgressStore {
    client: reqwest::Client,
    base: Url,
}

impl HttpProgressStore {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, mut base: Url) -> Self {
        // join() would drop the last path segment otherwise
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Self { client, base }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).context(EndpointSnafu { path })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &Url) -> Result<T> {
        let endpoint = endpoint.as_str();
        let response = request.send().await.context(TransportSnafu { endpoint })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return AuthRequiredSnafu { endpoint }.fail();
        }

        if !status.is_success() {
            return StatusSnafu {
                endpoint,
                status: status.as_u16(),
            }
            .fail();
        }

        let envelope: Envelope<T> = response.json().await.context(DecodeSnafu { endpoint })?;

        if !envelope.success {
            return RejectedSnafu {
                endpoint,
                message: envelope.message.unwrap_or_else(|| "no message".to_string()),
            }
            .fail();
        }

        Ok(envelope.body)
    }
}

/// Every response of the api is wrapped as `{ success, message?, ...body }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Deserialize)]
struct EnrollmentList {
    #[serde(default)]
    enrollments: Vec<Enrollment>,
}

#[derive(Debug, Deserialize)]
struct ExamList {
    #[serde(default)]
    exams: Vec<Exam>,
}

#[derive(Debug, Deserialize)]
struct Acknowledged {}

#[async_trait]
impl ProgressStore for HttpProgressStore {
    #[instrument(skip_all)]
    async fn my_enrollments(&self, token: &AuthToken) -> Result<Vec<Enrollment>> {
        let endpoint = self.endpoint(MY_ENROLLMENTS)?;
        tracing::debug!(%endpoint, "fetch enrollments");

        let request = self.client.get(endpoint.clone()).bearer_auth(token.expose_secret());
        let list: EnrollmentList = self.send(request, &endpoint).await?;

        Ok(list.enrollments)
    }

    #[instrument(skip(self, token), fields(course_id = %update.course_id, topic = %update.topic_name))]
    async fn update_topic_progress(
        &self, token: &AuthToken, update: &TopicProgressUpdate,
    ) -> Result<()> {
        let endpoint = self.endpoint(TOPIC_PROGRESS)?;
        tracing::debug!(%endpoint, watched_duration = update.watched_duration, "send topic progress");

        let request = self
            .client
            .put(endpoint.clone())
            .bearer_auth(token.expose_secret())
            .json(update);
        let _: Acknowledged = self.send(request, &endpoint).await?;

        Ok(())
    }

    #[instrument(skip_all)]
    async fn available_exams(&self, token: &AuthToken) -> Result<Vec<Exam>> {
        let endpoint = self.endpoint(AVAILABLE_EXAMS)?;
        tracing::debug!(%endpoint, "fetch available exams");

        let request = self.client.get(endpoint.clone()).bearer_auth(token.expose_secret());
        let list: ExamList = self.send(request, &endpoint).await?;

        Ok(list.exams)
    }
}
