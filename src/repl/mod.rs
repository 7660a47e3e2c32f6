//! Line oriented console for inspecting and driving an enrollment's progress.

use std::fmt::Write as _;
use std::io::Write as _;

use itertools::Itertools;
use snafu::ResultExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{ApplicationError, ConsoleSnafu};
use crate::model::{CourseId, Eligibility, Enrollment};
use crate::service::reconciler::Reconciler;

mod parse;

pub use parse::{parse, ParseError};

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Action {
    Status,
    Topics,
    Watch {
        course_id: CourseId,
        seconds: f64,
        topic_name: String,
    },
    Complete {
        course_id: CourseId,
        topic_name: String,
    },
    Refresh,
    Help,
    Exit,
    None,
}

const HELP: &str = "\
  status                                      watched percentage and exam eligibility
  topics                                      every topic with its progress and video source
  watch <course id> <seconds> <topic name>    reconcile observed playback of a topic
  complete <course id> <topic name>           mark a topic as fully watched
  refresh                                     re-fetch the enrollment
  exit";

pub async fn start(reconciler: &Reconciler) -> Result<(), ApplicationError> {
    tracing::info!("starting console");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let eligibility = reconciler.eligibility();

    reply(&render_status(&reconciler.snapshot(), &eligibility.borrow()))?;

    loop {
        print!("> ");
        std::io::stdout().flush().context(ConsoleSnafu)?;

        let Some(line) = lines.next_line().await.context(ConsoleSnafu)? else {
            break;
        };

        let action = match parse(&line) {
            Ok(action) => action,
            Err(err) => {
                reply(&format!("  {err}"))?;
                continue;
            }
        };

        let message = match action {
            Action::Exit => break,
            Action::None => continue,
            Action::Help => HELP.to_string(),
            Action::Status => render_status(&reconciler.snapshot(), &eligibility.borrow()),
            Action::Topics => render_topics(&reconciler.snapshot()),
            Action::Refresh => match reconciler.refresh().await {
                Ok(snapshot) => render_status(&snapshot, &eligibility.borrow()),
                Err(err) => render_error(&err),
            },
            Action::Watch {
                course_id,
                seconds,
                topic_name,
            } => match reconciler.reconcile(&course_id, &topic_name, seconds).await {
                Ok(snapshot) => render_topic_saved(&snapshot, &course_id, &topic_name),
                Err(err) => render_error(&err),
            },
            Action::Complete {
                course_id,
                topic_name,
            } => match reconciler.complete(&course_id, &topic_name).await {
                Ok(snapshot) => render_topic_saved(&snapshot, &course_id, &topic_name),
                Err(err) => render_error(&err),
            },
        };

        reply(&message)?;
    }

    tracing::info!("console closed");
    Ok(())
}

fn reply(message: &str) -> Result<(), ApplicationError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{message}").context(ConsoleSnafu)
}

fn render_error(err: &crate::service::reconciler::ReconcileError) -> String {
    let kind = err.kind();
    if kind.is_blocking() {
        format!("  {kind:?}: {err}\n  run `refresh` to try again")
    } else {
        format!("  {kind:?}: {err}")
    }
}

pub fn render_status(enrollment: &Enrollment, eligibility: &Eligibility) -> String {
    let mut out = String::new();
    let watched = enrollment.total_watched_seconds(None);

    let _ = writeln!(
        out,
        "  {} ({}): {}% watched, {:.0}s of {:.0}s",
        enrollment.stream.name,
        enrollment.id,
        enrollment.total_watched_percentage(None),
        watched,
        enrollment.total_course_duration,
    );

    if eligibility.exam_unlocked {
        let exams = eligibility
            .available_exams
            .iter()
            .map(|exam| exam.title.as_str())
            .join(", ");
        let exams = if exams.is_empty() { "none listed yet".to_string() } else { exams };
        let _ = write!(out, "  exam unlocked, available: {exams}");
    } else {
        let _ = write!(
            out,
            "  exam locked until {}% is watched",
            crate::model::EXAM_THRESHOLD_PERCENT
        );
    }

    out
}

pub fn render_topics(enrollment: &Enrollment) -> String {
    enrollment
        .stream
        .courses
        .iter()
        .flat_map(|course| {
            let header = format!("  {} [{}]", course.title, course.id);
            let topics = course.topics.iter().map(move |topic| {
                let watched = enrollment.previous_watched(&course.id, &topic.name);
                let mark = if enrollment.is_topic_watched(&course.id, &topic.name) { "x" } else { " " };
                let source = match topic.video_source() {
                    Ok(source) => format!("{source:?}"),
                    Err(err) => match err.fallback_url() {
                        Some(url) => format!("{err}, open externally: {url}"),
                        None => err.to_string(),
                    },
                };

                format!(
                    "    [{mark}] {} {:.0}/{:.0}s  {source}",
                    topic.name, watched, topic.duration
                )
            });

            std::iter::once(header).chain(topics)
        })
        .join("\n")
}

fn render_topic_saved(enrollment: &Enrollment, course_id: &CourseId, topic_name: &str) -> String {
    format!(
        "  saved `{topic_name}`: {:.0}s watched, course at {}%",
        enrollment.previous_watched(course_id, topic_name),
        enrollment.total_watched_percentage(None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Exam;
    use crate::service::cache::tests::{course_id, enrollment, row};

    #[test]
    fn status_of_locked_enrollment() {
        let enrollment = enrollment(vec![row("A", 600.0)]);
        let status = render_status(&enrollment, &enrollment.eligibility());

        assert_eq!(
            status,
            "  Systems (enr-1): 67% watched, 600s of 900s\n  exam locked until 80% is watched"
        );
    }

    #[test]
    fn status_lists_available_exams() {
        let enrollment = enrollment(vec![row("A", 600.0), row("B", 300.0)]);
        let mut eligibility = enrollment.eligibility();
        eligibility.available_exams = vec![Exam {
            id: "exam-1".to_string(),
            title: "Rust fundamentals".to_string(),
            course_id: None,
        }];

        let status = render_status(&enrollment, &eligibility);
        assert!(status.ends_with("exam unlocked, available: Rust fundamentals"));
    }

    #[test]
    fn topics_show_progress_and_sources() {
        let enrollment = enrollment(vec![row("A", 500.0)]);
        let topics = render_topics(&enrollment);
        let lines: Vec<&str> = topics.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(course_id().as_ref()));
        assert!(lines[1].starts_with("    [x] A 500/600s"));
        assert!(lines[1].contains("dQw4w9WgXcQ"));
        assert!(lines[2].starts_with("    [ ] B 0/300s"));
        assert!(lines[2].contains("is not a video link"));
    }
}
