//! Debounced place-search suggestions.
//!
//! Every input change bumps a generation counter and restarts a quiet-period
//! timer. When the timer fires, one lookup is issued for the text current at
//! that moment, tagged with the current generation. A response is applied only
//! if its generation is still current, so a slow response to an early
//! keystroke never clobbers a newer one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_executor::{Executor, Task};

use crate::geocoding::{Geocoder, Place};

/// Options controlling when lookups are issued.
#[derive(Debug, Clone)]
pub struct Options {
    /// How long the input must stay unchanged before a lookup fires.
    pub quiet_period: Duration,
    /// Inputs with fewer characters clear the suggestions and skip the lookup.
    pub min_query_chars: usize,
    /// A lookup still pending after this long counts as failed.
    pub lookup_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(300),
            min_query_chars: 3,
            lookup_timeout: Duration::from_secs(10),
        }
    }
}

struct Inner {
    query: String,
    suggestions: Vec<Place>,
    fetched: bool,
    generation: u64,
    disposed: bool,
    sender: async_broadcast::Sender<()>,
    /// Kept alive so new receivers don't see a closed channel before dispose.
    _keep_alive: async_broadcast::InactiveReceiver<()>,
}

impl Inner {
    fn notify(&self) {
        let _ = self.sender.try_broadcast(());
    }
}

/// Controller behind a location input field with a suggestion dropdown.
///
/// Created with [`SearchBox::start`]; torn down with [`SearchBox::dispose`]
/// or by dropping it. After teardown no pending timer fires and no in-flight
/// lookup touches the state.
pub struct SearchBox {
    executor: Arc<Executor<'static>>,
    geocoder: Arc<dyn Geocoder>,
    options: Options,
    inner: Arc<Mutex<Inner>>,
    on_place_changed: Box<dyn FnMut(&Place) + Send>,
    /// The debounce timer. Dropping the task cancels it.
    pending: Option<Task<()>>,
    /// Dropped on dispose, which abandons every in-flight lookup.
    shutdown_tx: Option<async_channel::Sender<()>>,
    shutdown_rx: async_channel::Receiver<()>,
}

impl SearchBox {
    /// Create a search box with an empty query.
    ///
    /// Timers and lookups run on `executor`. `on_place_changed` is called
    /// once per [`select_place`](Self::select_place).
    pub fn start(
        executor: Arc<Executor<'static>>,
        geocoder: impl Geocoder,
        options: Options,
        on_place_changed: impl FnMut(&Place) + Send + 'static,
    ) -> Self {
        let (mut sender, receiver) = async_broadcast::broadcast(16);
        sender.set_overflow(true);
        let keep_alive = receiver.deactivate();
        let (shutdown_tx, shutdown_rx) = async_channel::bounded::<()>(1);

        Self {
            executor,
            geocoder: Arc::new(geocoder),
            options,
            inner: Arc::new(Mutex::new(Inner {
                query: String::new(),
                suggestions: Vec::new(),
                fetched: false,
                generation: 0,
                disposed: false,
                sender,
                _keep_alive: keep_alive,
            })),
            on_place_changed: Box::new(on_place_changed),
            pending: None,
            shutdown_tx: Some(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Record new input and schedule a lookup for it.
    ///
    /// The query is updated immediately. Short input clears the suggestions
    /// right away and schedules nothing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_query_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.pending = None;

        let scheduled = {
            let mut inner = self.inner.lock().expect("poisoned");
            if inner.disposed {
                return;
            }
            inner.generation += 1;
            inner.fetched = false;
            let long_enough = text.chars().count() >= self.options.min_query_chars;
            if !long_enough {
                inner.suggestions.clear();
            }
            inner.query = text;
            inner.notify();
            long_enough.then_some(inner.generation)
        };

        if let Some(generation) = scheduled {
            self.schedule(generation);
        }
    }

    /// Accept a suggestion.
    ///
    /// Sets the query to the place's label, clears the suggestions, discards
    /// any pending or in-flight lookup and calls `on_place_changed`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn select_place(&mut self, place: Place) {
        self.pending = None;

        {
            let mut inner = self.inner.lock().expect("poisoned");
            if inner.disposed {
                return;
            }
            inner.generation += 1;
            inner.fetched = false;
            inner.query.clone_from(&place.label);
            inner.suggestions.clear();
            inner.notify();
        }

        tracing::debug!(label = %place.label, "place selected");
        (self.on_place_changed)(&place);
    }

    /// Tear down: cancel the pending timer and abandon in-flight lookups.
    ///
    /// Further input and selections are ignored. Calling it again is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn dispose(&mut self) {
        {
            let mut inner = self.inner.lock().expect("poisoned");
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.generation += 1;
            inner.sender.close();
        }
        self.pending = None;
        self.shutdown_tx = None;
        tracing::debug!("search box disposed");
    }

    /// The current input text.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn query(&self) -> String {
        self.inner.lock().expect("poisoned").query.clone()
    }

    /// The current suggestions, in service order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn suggestions(&self) -> Vec<Place> {
        self.inner.lock().expect("poisoned").suggestions.clone()
    }

    /// Whether a lookup result (possibly empty) has been applied for the
    /// current input.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn has_fetched(&self) -> bool {
        self.inner.lock().expect("poisoned").fetched
    }

    /// Change notifications: one item per state change, coalesced when the
    /// receiver falls behind. Ends on dispose.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn listen(&self) -> async_broadcast::Receiver<()> {
        self.inner.lock().expect("poisoned").sender.new_receiver()
    }

    fn schedule(&mut self, generation: u64) {
        let lookup = Lookup {
            geocoder: Arc::clone(&self.geocoder),
            inner: Arc::clone(&self.inner),
            shutdown_rx: self.shutdown_rx.clone(),
            timeout: self.options.lookup_timeout,
        };
        let executor = Arc::clone(&self.executor);
        let quiet_period = self.options.quiet_period;

        self.pending = Some(self.executor.spawn(async move {
            async_io::Timer::after(quiet_period).await;
            let Some(query) = lookup.capture(generation) else {
                return;
            };
            // In-flight lookups outlive newer input; the generation check
            // decides whether their result lands.
            executor.spawn(lookup.run(generation, query)).detach();
        }));
    }
}

impl Drop for SearchBox {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// One network lookup and everything it needs once detached.
struct Lookup {
    geocoder: Arc<dyn Geocoder>,
    inner: Arc<Mutex<Inner>>,
    shutdown_rx: async_channel::Receiver<()>,
    timeout: Duration,
}

enum Outcome {
    Found(exn::Result<Vec<Place>, crate::geocoding::Error>),
    TimedOut,
    Abandoned,
}

impl Lookup {
    /// The text to search for, read when the timer fires.
    ///
    /// `None` if the timer was superseded after it already started running.
    fn capture(&self, generation: u64) -> Option<String> {
        let inner = self.inner.lock().expect("poisoned");
        (!inner.disposed && inner.generation == generation).then(|| inner.query.clone())
    }

    async fn run(self, generation: u64, query: String) {
        tracing::debug!(generation, query = %query, "issuing place lookup");

        // `or` polls its first future first: shutdown wins ties.
        let outcome = futures_lite::future::or(
            async {
                let _ = self.shutdown_rx.recv().await;
                Outcome::Abandoned
            },
            futures_lite::future::or(
                async { Outcome::Found(self.geocoder.search(query.clone()).await) },
                async {
                    async_io::Timer::after(self.timeout).await;
                    Outcome::TimedOut
                },
            ),
        )
        .await;

        let suggestions = match outcome {
            Outcome::Found(Ok(places)) => places,
            Outcome::Found(Err(e)) => {
                tracing::warn!(%e, query = %query, "place lookup failed");
                Vec::new()
            }
            Outcome::TimedOut => {
                tracing::warn!(
                    query = %query,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "place lookup timed out"
                );
                Vec::new()
            }
            Outcome::Abandoned => {
                tracing::debug!(generation, "place lookup abandoned");
                return;
            }
        };

        let mut inner = self.inner.lock().expect("poisoned");
        if inner.disposed || inner.generation != generation {
            tracing::debug!(
                generation,
                current = inner.generation,
                "discarding stale place lookup"
            );
            return;
        }
        inner.suggestions = suggestions;
        inner.fetched = true;
        inner.notify();
    }
}
