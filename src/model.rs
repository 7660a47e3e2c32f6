use derive_more::From;
use derive_new::new;
use serde::{Deserialize, Serialize};
use url::Url;

pub use course_id::*;
pub use enrollment::*;
pub use timestamp::*;
pub use video_source::*;

mod course_id;
mod enrollment;
mod timestamp;
mod video_source;
