//! Bridges a video widget's playback clock to the reconciler.
//!
//! Each open topic runs as a [PlaybackSession](session::PlaybackSession) task. While playing it
//! samples the widget on a UI tick (display only) and a save tick (reconciles when playback moved
//! past what was last acknowledged). Pausing or ending stops both timers and saves immediately;
//! closing the session only stops the timers and destroys the widget.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use derive_new::new;
use futures::Future;
use snafu::OptionExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::instrument;

use crate::model::{EnrollmentId, TopicKey};
use crate::service::reconciler::{ReconcileError, Reconciler, UnknownTopicSnafu};

pub use player::*;
pub use session::SessionProgress;

use session::{PlaybackSession, Quit, QuitSignal, SessionCommand};

mod player;
mod session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How often the visible progress is refreshed.
    pub ui_tick: Duration,
    /// How often playing sessions save their progress.
    pub save_tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ui_tick: Duration::from_secs(1),
            save_tick: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
struct SessionTask {
    topic: TopicKey,
    tx: oneshot::Sender<Quit>,
    handle: tokio::task::JoinHandle<()>,
}

impl SessionTask {
    fn spawn<F>(topic: TopicKey, f: impl FnOnce(QuitSignal) -> F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::task::spawn(f(rx));
        Self { topic, tx, handle }
    }

    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    fn quit(self) {
        let _ = self.tx.send(Quit);
    }

    async fn shutdown(self) {
        let _ = self.tx.send(Quit);
        let _ = self.handle.await;
    }
}

/// Forwards widget events to an open session and exposes its visible progress.
///
/// Dropping every handle of a session tears it down like [SessionManager::close].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    topic: TopicKey,
    commands: mpsc::UnboundedSender<SessionCommand>,
    progress: watch::Receiver<SessionProgress>,
}

impl SessionHandle {
    pub fn topic(&self) -> &TopicKey {
        &self.topic
    }

    /// Forward a widget state change. Returns `false` when the session is already closed.
    pub fn notify(&self, event: PlayerEvent) -> bool {
        self.commands.send(SessionCommand::Player(event)).is_ok()
    }

    /// Mark the topic as fully watched, as if playback reached the end.
    pub fn mark_complete(&self) -> bool {
        self.commands.send(SessionCommand::MarkComplete).is_ok()
    }

    pub fn progress(&self) -> SessionProgress {
        self.progress.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionProgress> {
        self.progress.clone()
    }
}

/// Keeps at most one playback session per enrollment.
#[derive(Debug, new)]
pub struct SessionManager {
    #[new(default)]
    sessions: DashMap<EnrollmentId, SessionTask>,
    config: SessionConfig,
}

impl SessionManager {
    /// Open a topic for playback, closing whatever the enrollment was playing before.
    #[instrument(skip(self, reconciler, player), fields(enrollment_id = %reconciler.enrollment_id()))]
    pub fn open<P: VideoPlayer>(
        &self, reconciler: Arc<Reconciler>, topic: TopicKey, player: P,
    ) -> Result<SessionHandle, ReconcileError> {
        let duration = reconciler
            .snapshot()
            .topic_duration(&topic.course_id, &topic.topic_name)
            .context(UnknownTopicSnafu {
                course_id: topic.course_id.clone(),
                topic_name: topic.topic_name.clone(),
            })?;

        let enrollment_id = reconciler.enrollment_id().clone();
        if let Some((_, existing)) = self.sessions.remove(&enrollment_id) {
            tracing::info!(previous = %existing.topic, "switching from `{}` to `{}`", existing.topic, topic);
            existing.quit();
        }

        let (commands, receiver) = mpsc::unbounded_channel();
        let (progress, progress_rx) =
            watch::channel(SessionProgress::new(topic.clone(), duration));

        let session = PlaybackSession {
            topic: topic.clone(),
            duration,
            player,
            reconciler,
            config: self.config,
            progress,
            state: PlaybackState::Unstarted,
            current_observed: 0.0,
            last_reconciled: 0.0,
            ui_timer: None,
            save_timer: None,
        };

        tracing::info!(duration, "open playback of `{}`", topic);
        let task = SessionTask::spawn(topic.clone(), |quit| session.run(receiver, quit));
        self.sessions.insert(enrollment_id, task);

        Ok(SessionHandle {
            topic,
            commands,
            progress: progress_rx,
        })
    }

    /// The topic the enrollment is playing. Sessions whose handles were all dropped are forgotten.
    pub fn active_topic(&self, enrollment_id: &EnrollmentId) -> Option<TopicKey> {
        self.sessions.remove_if(enrollment_id, |_, task| task.is_finished());
        self.sessions
            .get(enrollment_id)
            .map(|task| task.topic.clone())
    }

    /// Close the enrollment's session and wait for its widget to be destroyed.
    pub async fn close(&self, enrollment_id: &EnrollmentId) {
        if let Some((_, task)) = self.sessions.remove(enrollment_id) {
            tracing::info!("close playback of `{}`", task.topic);
            task.shutdown().await;
        }
    }

    pub async fn shutdown(&self) {
        let enrollment_ids: Vec<EnrollmentId> =
            self.sessions.iter().map(|x| x.key().clone()).collect();

        for enrollment_id in enrollment_ids {
            self.close(&enrollment_id).await;
        }
    }
}
