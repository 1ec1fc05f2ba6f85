use sentry::protocol::{Frame, Stacktrace};

/// Parse a V8 stack string (`Error: msg\n    at fn (file:1:2)\n ...`) into a
/// Sentry stacktrace.
///
/// Lines that are not frames, including the leading `Error: ..` header, are
/// ignored. Returns `None` when no frame could be parsed.
pub fn parse_v8_stack(stack: &str) -> Option<Stacktrace> {
    let mut frames: Vec<Frame> = stack.lines().filter_map(parse_frame).collect();
    if frames.is_empty() {
        return None;
    }

    // V8 lists the innermost call first, Sentry expects it last.
    frames.reverse();

    Some(Stacktrace {
        frames,
        ..Default::default()
    })
}

fn parse_frame(line: &str) -> Option<Frame> {
    let rest = line.trim().strip_prefix("at ")?;

    let (function, location) = match rest.strip_suffix(')').and_then(|r| r.split_once(" (")) {
        Some((function, location)) => (Some(function), location),
        None => (None, rest),
    };

    let function = function
        .map(|f| f.strip_prefix("async ").unwrap_or(f))
        .map(str::to_owned);
    let (filename, lineno, colno) = split_location(location);
    let in_app = !(filename.starts_with("node:")
        || filename.contains("node_modules")
        || filename == "native"
        || filename == "<anonymous>");

    Some(Frame {
        function,
        abs_path: Some(filename.clone()),
        filename: Some(filename),
        lineno,
        colno,
        in_app: Some(in_app),
        ..Default::default()
    })
}

fn split_location(location: &str) -> (String, Option<u64>, Option<u64>) {
    let mut parts = location.rsplitn(3, ':');
    let colno = parts.next().and_then(|c| c.parse().ok());
    let lineno = parts.next().and_then(|l| l.parse().ok());

    match (parts.next(), lineno, colno) {
        (Some(file), Some(lineno), Some(colno)) => (file.to_owned(), Some(lineno), Some(colno)),
        _ => (location.to_owned(), None, None),
    }
}
