use derive_more::{AsRef, Deref, From};
use derive_new::new;
use serde::{Deserialize, Serialize};

pub fn now() -> Timestamp {
    chrono::Utc::now().into()
}

/// A UTC instant exchanged with the progress store as an RFC 3339 string. Any offset is
/// accepted on input and normalized to UTC.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, new, From, Deref, AsRef,
)]
#[serde(transparent)]
pub struct Timestamp(chrono::DateTime<chrono::Utc>);
