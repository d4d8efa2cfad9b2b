use std::fmt::Write as _;
use std::io;

use futures_lite::io::AsyncBufReadExt;
use futures_lite::{Stream, StreamExt};

use zerotrash_places::{Place, SearchBox};

/// One line of terminal input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    /// Replace the query text.
    Query(String),
    /// Pick the suggestion at this 1-based position.
    Select(usize),
}

#[must_use]
pub fn parse_line(line: &str) -> Input {
    line.strip_prefix(':')
        .and_then(|n| n.trim().parse().ok())
        .map_or_else(|| Input::Query(line.to_owned()), Input::Select)
}

/// Render the dropdown for the current state, or `None` if there is nothing
/// to show.
#[must_use]
pub fn format_suggestions(suggestions: &[Place], fetched: bool) -> Option<String> {
    if suggestions.is_empty() {
        return fetched.then(|| String::from("  (no matches)\n"));
    }
    let mut out = String::new();
    for (i, place) in suggestions.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, place.label);
    }
    Some(out)
}

#[must_use]
pub fn format_selection(place: &Place) -> String {
    format!(
        "selected: {} ({}, {})",
        place.label, place.latitude, place.longitude
    )
}

/// Next line from `lines`, or `None` at end of input.
///
/// Lines that are not valid UTF-8 are skipped; any other read error ends
/// the input.
async fn next_line<S>(lines: &mut S) -> Option<String>
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => return Some(line),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                tracing::warn!(%e, "skipping unreadable input line");
            }
            Err(e) => {
                tracing::error!(%e, "failed to read input");
                return None;
            }
        }
    }
    None
}

/// Drive `search` from stdin until EOF, printing suggestions as they change.
pub async fn run(mut search: SearchBox) {
    let stdin = blocking::Unblock::new(std::io::stdin());
    let mut lines = futures_lite::io::BufReader::new(stdin).lines();
    let mut changes = search.listen();
    let mut shown: Option<String> = None;

    loop {
        enum Branch {
            Line(Option<String>),
            Changed(Option<()>),
        }

        let branch = futures_lite::future::or(
            async { Branch::Line(next_line(&mut lines).await) },
            async { Branch::Changed(changes.next().await) },
        )
        .await;

        match branch {
            Branch::Line(None) | Branch::Changed(None) => break,
            Branch::Line(Some(line)) => match parse_line(&line) {
                Input::Query(text) => search.set_query_text(text),
                Input::Select(n) => {
                    let suggestions = search.suggestions();
                    match n.checked_sub(1).and_then(|i| suggestions.get(i)) {
                        Some(place) => search.select_place(place.clone()),
                        None => println!("no suggestion {n}"),
                    }
                }
            },
            Branch::Changed(Some(())) => {
                let rendered = format_suggestions(&search.suggestions(), search.has_fetched());
                if rendered != shown {
                    if let Some(text) = &rendered {
                        print!("{text}");
                    }
                    shown = rendered;
                }
            }
        }
    }

    search.dispose();
}
