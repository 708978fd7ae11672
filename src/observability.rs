use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("palaver.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("palaver.client.request_errors");
pub(crate) static CLIENT_REQUEST_RETRIES: Counter = Counter::new("palaver.client.retries");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("palaver.client.request_duration_seconds");

pub(crate) static CACHE_HITS: Counter = Counter::new("palaver.cache.hits");
pub(crate) static CACHE_MISSES: Counter = Counter::new("palaver.cache.misses");
pub(crate) static CACHE_EVICTIONS: Counter = Counter::new("palaver.cache.evictions");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("palaver.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("palaver.stream.errors");

pub(crate) static POLL_ATTEMPTS: Counter = Counter::new("palaver.poll.attempts");
pub(crate) static POLL_DELIVERIES: Counter = Counter::new("palaver.poll.deliveries");
pub(crate) static POLL_TIMEOUTS: Counter = Counter::new("palaver.poll.timeouts");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_REQUEST_RETRIES);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&CACHE_HITS);
    collector.register_counter(&CACHE_MISSES);
    collector.register_counter(&CACHE_EVICTIONS);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);

    collector.register_counter(&POLL_ATTEMPTS);
    collector.register_counter(&POLL_DELIVERIES);
    collector.register_counter(&POLL_TIMEOUTS);
}
