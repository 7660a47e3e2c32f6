use std::sync::Arc;

use tokio::select;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Interval;
use tracing::instrument;

use super::player::{PlaybackState, PlayerEvent, VideoPlayer};
use super::SessionConfig;
use crate::model::TopicKey;
use crate::service::reconciler::Reconciler;
use crate::time::{next_tick, ticker};

pub(super) type QuitSignal = oneshot::Receiver<Quit>;

#[derive(Debug, Clone, Copy)]
pub(super) struct Quit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SessionCommand {
    Player(PlayerEvent),
    MarkComplete,
}

/// What the UI shows for the open topic, refreshed on every UI tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProgress {
    pub topic: TopicKey,
    pub state: PlaybackState,
    pub current_seconds: f64,
    pub duration: f64,
    pub percentage: u8,
}

impl SessionProgress {
    pub(super) fn new(topic: TopicKey, duration: f64) -> Self {
        Self {
            topic,
            state: PlaybackState::Unstarted,
            current_seconds: 0.0,
            duration,
            percentage: 0,
        }
    }
}

/// State of one open topic. Lives inside its own task until quit or until every handle is gone.
pub(super) struct PlaybackSession<P> {
    pub(super) topic: TopicKey,
    pub(super) duration: f64,
    pub(super) player: P,
    pub(super) reconciler: Arc<Reconciler>,
    pub(super) config: SessionConfig,
    pub(super) progress: watch::Sender<SessionProgress>,
    pub(super) state: PlaybackState,
    pub(super) current_observed: f64,
    pub(super) last_reconciled: f64,
    pub(super) ui_timer: Option<Interval>,
    pub(super) save_timer: Option<Interval>,
}

impl<P: VideoPlayer> PlaybackSession<P> {
    #[instrument(skip_all, fields(topic = %self.topic))]
    pub(super) async fn run(
        mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>, mut quit: QuitSignal,
    ) {
        self.resume().await;

        let (acks_tx, mut acks) = mpsc::unbounded_channel();

        loop {
            select! {
                _ = &mut quit => break,

                command = commands.recv() => match command {
                    Some(SessionCommand::Player(event)) => self.on_event(event, &acks_tx).await,
                    Some(SessionCommand::MarkComplete) => self.on_event(PlayerEvent::Ended, &acks_tx).await,
                    None => break,
                },

                Some(acknowledged) = acks.recv() => {
                    self.last_reconciled = self.last_reconciled.max(acknowledged);
                }

                _ = next_tick(&mut self.ui_timer) => {
                    self.sample().await;
                    self.publish();
                }

                _ = next_tick(&mut self.save_timer) => {
                    self.sample().await;
                    if self.current_observed > self.last_reconciled {
                        self.spawn_reconcile(acks_tx.clone());
                    }
                }
            }
        }

        self.stop_timers();
        self.player.destroy().await;
        tracing::info!("closed playback of `{}`", self.topic);
    }

    /// Seek to where the learner left off.
    async fn resume(&mut self) {
        let reader = self.reconciler.reader();
        let previous = reader.previous_watched(&self.topic.course_id, &self.topic.topic_name);
        let position = reader
            .resume_position(&self.topic.course_id, &self.topic.topic_name)
            .clamp(0.0, self.duration);

        if position > 0.0 {
            tracing::debug!(previous, position, "resume `{}` at {position}s", self.topic);
            self.player.seek_to(position).await;
        }

        self.current_observed = position;
        self.last_reconciled = previous;
        self.publish();
    }

    /// Pausing and ending save right away, in the background so a slow store never holds up
    /// teardown.
    async fn on_event(&mut self, event: PlayerEvent, acks: &mpsc::UnboundedSender<f64>) {
        tracing::debug!(?event, from = ?self.state, "player event");

        match event {
            PlayerEvent::Playing if self.state == PlaybackState::Playing => return,
            PlayerEvent::Playing => {
                self.ui_timer = Some(ticker(self.config.ui_tick));
                self.save_timer = Some(ticker(self.config.save_tick));
            }
            PlayerEvent::Paused => {
                self.stop_timers();
                self.sample().await;
            }
            PlayerEvent::Ended => {
                self.stop_timers();
                self.current_observed = self.duration;
            }
        }

        self.state = event.into();
        self.publish();

        if event != PlayerEvent::Playing {
            self.spawn_reconcile(acks.clone());
        }
    }

    fn stop_timers(&mut self) {
        self.ui_timer = None;
        self.save_timer = None;
    }

    async fn sample(&mut self) {
        if let Some(seconds) = self.player.current_time().await.filter(|s| s.is_finite()) {
            self.current_observed = seconds.clamp(0.0, self.duration);
        }
    }

    fn publish(&self) {
        let percentage = if self.duration > 0.0 {
            (self.current_observed / self.duration * 100.0).round().clamp(0.0, 100.0) as u8
        } else {
            0
        };

        self.progress.send_replace(SessionProgress {
            topic: self.topic.clone(),
            state: self.state,
            current_seconds: self.current_observed,
            duration: self.duration,
            percentage,
        });
    }

    /// Save in the background; the timers keep running while the request is in flight.
    fn spawn_reconcile(&self, acks: mpsc::UnboundedSender<f64>) {
        let reconciler = self.reconciler.clone();
        let topic = self.topic.clone();
        let seconds = self.current_observed;

        tokio::spawn(async move {
            match reconciler
                .reconcile(&topic.course_id, &topic.topic_name, seconds)
                .await
            {
                Ok(snapshot) => {
                    let _ = acks.send(snapshot.previous_watched(&topic.course_id, &topic.topic_name));
                }
                Err(error) => {
                    tracing::warn!(%topic, %error, "progress of `{}` not saved: {}", topic, error)
                }
            }
        });
    }
}
