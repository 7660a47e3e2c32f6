use async_trait::async_trait;

/// Handle to an embedded video widget.
///
/// The widget reports state changes as [PlayerEvent]s through the session handle; the session
/// only pulls the playback clock and issues seeks.
#[async_trait]
pub trait VideoPlayer: Send + 'static {
    /// Current playback position in seconds, `None` while the widget cannot tell.
    async fn current_time(&mut self) -> Option<f64>;

    async fn seek_to(&mut self, seconds: f64);

    /// Release the widget. Called exactly once when the session ends.
    async fn destroy(&mut self);
}

/// State changes emitted by the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Playing,
    Paused,
    Ended,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Unstarted,
    Playing,
    Paused,
    Ended,
}

impl From<PlayerEvent> for PlaybackState {
    fn from(event: PlayerEvent) -> Self {
        match event {
            PlayerEvent::Playing => Self::Playing,
            PlayerEvent::Paused => Self::Paused,
            PlayerEvent::Ended => Self::Ended,
        }
    }
}
