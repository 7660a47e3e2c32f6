use snafu::{OptionExt as _, Snafu};

use super::*;

/// Where a topic's video is played from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Played through the embedded YouTube widget.
    YouTube { id: String },
    /// A plain media file the player can stream directly.
    Direct { url: Url },
}

impl VideoSource {
    const MEDIA_EXTENSIONS: [&'static str; 4] = [".mp4", ".webm", ".m3u8", ".mov"];

    pub fn parse(link: &str) -> Result<VideoSource, VideoSourceError> {
        let link = link.trim();

        // if text is not a url, it has to be a bare video id
        let Ok(url) = Url::parse(link) else {
            return if is_youtube_id(link) {
                Ok(VideoSource::YouTube { id: link.to_string() })
            } else {
                Err(VideoSourceError::Unparseable { link: link.to_string() })
            };
        };

        match url.host_str() {
            Some("youtu.be") => {
                let id = url
                    .path_segments()
                    .and_then(|mut segments| segments.next())
                    .filter(|id| is_youtube_id(id))
                    .context(MissingIdFragmentSnafu { link })?;
                Ok(VideoSource::YouTube { id: id.to_string() })
            }
            Some("www.youtube.com" | "youtube.com" | "m.youtube.com") => {
                let id = youtube_id_from_url(&url).context(MissingIdFragmentSnafu { link })?;
                Ok(VideoSource::YouTube { id })
            }
            Some(_) if is_media_file(&url) => Ok(VideoSource::Direct { url: url.clone() }),
            _ => Err(VideoSourceError::Unsupported { link: link.to_string() }),
        }
    }
}

fn youtube_id_from_url(url: &Url) -> Option<String> {
    if let Some(id) = url
        .query_pairs()
        .find_map(|(key, value)| (key == "v").then_some(value))
    {
        return is_youtube_id(&id).then(|| id.to_string());
    }

    // embed/<id>, shorts/<id> and live/<id>
    let mut segments = url.path_segments()?;
    let kind = segments.next()?;
    let id = segments.next()?;

    (matches!(kind, "embed" | "shorts" | "live") && is_youtube_id(id)).then(|| id.to_string())
}

fn is_youtube_id(text: &str) -> bool {
    text.len() == 11
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_media_file(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    VideoSource::MEDIA_EXTENSIONS
        .iter()
        .any(|extension| path.ends_with(extension))
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum VideoSourceError {
    /// link is neither a url nor a video id
    #[snafu(display("`{link}` is not a video link"))]
    Unparseable { link: String },

    /// link is a YouTube url, but it's missing the id fragment
    #[snafu(display("`{link}` does not contain a video id"))]
    MissingIdFragment { link: String },

    /// link is a url the player cannot embed
    #[snafu(display("`{link}` cannot be played inline"))]
    Unsupported { link: String },
}

impl VideoSourceError {
    pub fn kind(&self) -> crate::error::ErrorKind {
        crate::error::ErrorKind::InvalidVideoSource
    }

    pub fn link(&self) -> &str {
        match self {
            Self::Unparseable { link }
            | Self::MissingIdFragment { link }
            | Self::Unsupported { link } => link,
        }
    }

    /// The url to offer as an "open externally" action, when the link is a url at all.
    pub fn fallback_url(&self) -> Option<Url> {
        Url::parse(self.link()).ok()
    }
}
