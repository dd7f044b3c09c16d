//! Server-Sent Events framing for suggestion runs.
//!
//! Each profile snapshot becomes an `event: profile` carrying the profile as
//! JSON. A run that stops on an error sends `event: error` with the message.
//! Every stream ends with `event: done`.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::error;

use authornet_ingestion::collator::AuthorProfile;

pub fn profile_events<S>(profiles: S) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static
where
    S: Stream<Item = authornet_common::Result<AuthorProfile>> + Send + 'static,
{
    profiles
        .map(|item| Ok::<_, Infallible>(to_event(item)))
        .chain(tokio_stream::once(Ok(Event::default().event("done").data("done"))))
}

/// Wrap a profile stream in an SSE response with periodic keep-alives.
pub fn profile_sse<S>(profiles: S) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static>
where
    S: Stream<Item = authornet_common::Result<AuthorProfile>> + Send + 'static,
{
    Sse::new(profile_events(profiles)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn to_event(item: authornet_common::Result<AuthorProfile>) -> Event {
    let profile = match item {
        Ok(profile) => profile,
        Err(e) => return Event::default().event("error").data(e.to_string()),
    };
    match Event::default().event("profile").json_data(&profile) {
        Ok(event) => event,
        Err(e) => {
            error!(key = %profile.unique_name_descriptor, error = %e, "Could not encode profile");
            Event::default().event("error").data(format!("could not encode profile: {e}"))
        }
    }
}
