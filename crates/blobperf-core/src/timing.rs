use std::future::Future;
use std::time::{Duration, Instant};

/// A stage output together with the wall-clock window that produced it.
#[derive(Clone, Copy, Debug)]
pub struct Timed<T> {
    pub value: T,
    pub started: Instant,
    pub finished: Instant,
}

impl<T> Timed<T> {
    pub fn elapsed(&self) -> Duration {
        self.finished.saturating_duration_since(self.started)
    }

    pub fn elapsed_ms(&self) -> f64 {
        millis(self.elapsed())
    }

    /// Replace the value, keeping the window.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Timed<U> {
        Timed {
            value: f(self.value),
            started: self.started,
            finished: self.finished,
        }
    }
}

impl<T, E> Timed<Result<T, E>> {
    /// Move the window inside the result.
    pub fn transpose(self) -> Result<Timed<T>, E> {
        let Timed {
            value,
            started,
            finished,
        } = self;
        value.map(|value| Timed {
            value,
            started,
            finished,
        })
    }
}

/// Await `fut` and record how long it took.
pub async fn timed<F: Future>(fut: F) -> Timed<F::Output> {
    let started = Instant::now();
    let value = fut.await;
    Timed {
        value,
        started,
        finished: Instant::now(),
    }
}

/// Run `f` and record how long it took.
pub fn timed_sync<T>(f: impl FnOnce() -> T) -> Timed<T> {
    let started = Instant::now();
    let value = f();
    Timed {
        value,
        started,
        finished: Instant::now(),
    }
}

/// Duration in fractional milliseconds.
pub fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
