//! Call-site capture for error reports.
//!
//! The captured stack starts at the first frame outside this crate, so a
//! report shows the caller's own context rather than the reporting machinery.

use std::backtrace::{Backtrace, BacktraceStatus};

use sentry::integrations::backtrace::parse_stacktrace;
use sentry::protocol::Frame;

/// Frames produced while taking the backtrace itself.
const CAPTURE_FUNCTION_PREFIXES: &[&str] = &["std::backtrace", "backtrace::", "sentry_backtrace::"];
const CRATE_FUNCTION_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::");
/// Matches both absolute and workspace-relative source paths of this crate.
const CRATE_SOURCE_MARKER: &str = concat!(env!("CARGO_PKG_NAME"), "/src/");
const STD_SOURCE_MARKER: &str = "/rustc/";
const UNKNOWN_FUNCTION: &str = "<unknown>";

/// Captures the current call stack and renders it one frame per line as
/// `function (file:line:col)`, prefixed by `partial_message` when it is not
/// empty. Leading frames from this crate are dropped.
///
/// Returns `partial_message` unchanged when no stack information is available.
pub fn build_stack_trace(partial_message: &str) -> String {
    let frames = capture_frames();
    render(partial_message, &strip_internal_frames(frames))
}

/// Renders a backtrace that an error carried with it, all frames kept.
/// `None` when the backtrace was not captured.
pub(crate) fn format_backtrace(backtrace: &Backtrace) -> Option<String> {
    let frames = parse_frames(backtrace);
    if frames.is_empty() {
        return None;
    }
    Some(render("", &frames))
}

fn capture_frames() -> Vec<Frame> {
    parse_frames(&Backtrace::force_capture())
}

/// Innermost frame first.
fn parse_frames(backtrace: &Backtrace) -> Vec<Frame> {
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }

    match parse_stacktrace(&backtrace.to_string()) {
        Some(stacktrace) => {
            // parsed frames are ordered outermost first
            let mut frames = stacktrace.frames;
            frames.reverse();
            frames
        }
        None => Vec::new(),
    }
}

fn strip_internal_frames(frames: Vec<Frame>) -> Vec<Frame> {
    frames
        .into_iter()
        .skip_while(is_internal_frame)
        .collect()
}

pub(crate) fn is_internal_frame(frame: &Frame) -> bool {
    let function = frame
        .function
        .as_deref()
        .unwrap_or_default()
        .trim_start_matches('<');

    if function.starts_with(CRATE_FUNCTION_PREFIX)
        || CAPTURE_FUNCTION_PREFIXES
            .iter()
            .any(|prefix| function.starts_with(prefix))
    {
        return true;
    }

    frame_path(frame)
        .map(|path| path.contains(CRATE_SOURCE_MARKER) || path.contains(STD_SOURCE_MARKER))
        .unwrap_or(false)
}

fn frame_path(frame: &Frame) -> Option<&str> {
    frame.abs_path.as_deref().or(frame.filename.as_deref())
}

fn format_frame(frame: &Frame) -> String {
    let function = frame.function.as_deref().unwrap_or(UNKNOWN_FUNCTION);
    let Some(path) = frame_path(frame) else {
        return function.to_string();
    };

    match (frame.lineno, frame.colno) {
        (Some(line), Some(column)) => format!("{} ({}:{}:{})", function, path, line, column),
        (Some(line), None) => format!("{} ({}:{})", function, path, line),
        _ => format!("{} ({})", function, path),
    }
}

fn render(partial_message: &str, frames: &[Frame]) -> String {
    let lines = frames.iter().map(format_frame);

    if partial_message.is_empty() {
        lines.collect::<Vec<_>>().join("\n")
    } else {
        std::iter::once(partial_message.to_string())
            .chain(lines)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
