//! Playback clock: logical elapsed time for an utterance's audio

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the clock derives elapsed time.
enum TimeSource {
    /// Wall-monotonic since `started_at`, minus time spent paused
    Monotonic {
        started_at: Instant,
        paused_at: Option<Instant>,
        paused_total: Duration,
    },
    /// Driven by playback-position reports from the audio device.
    /// Device position can jitter slightly backward; the synchronizer is
    /// responsible for absorbing that.
    Reported { position: Duration },
}

struct ClockInner {
    source: TimeSource,
    /// Set on cancel/finish; freezes `elapsed()` at the last reading
    frozen: Option<Duration>,
}

/// A monotonically increasing logical time source tied to one utterance's
/// audio playback.
///
/// Owned by the speech renderer; the animation synchronizer only ever reads
/// `elapsed()`. Pause, resume, and invalidation happen atomically with the
/// audio device state they mirror.
pub struct PlaybackClock {
    inner: Mutex<ClockInner>,
}

impl PlaybackClock {
    /// Start a clock running from now
    pub fn started() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ClockInner {
                source: TimeSource::Monotonic {
                    started_at: Instant::now(),
                    paused_at: None,
                    paused_total: Duration::ZERO,
                },
                frozen: None,
            }),
        })
    }

    /// Create a clock driven by device position reports (`set_position`)
    pub fn reported() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ClockInner {
                source: TimeSource::Reported {
                    position: Duration::ZERO,
                },
                frozen: None,
            }),
        })
    }

    /// Elapsed playback time since the utterance began.
    ///
    /// After invalidation this returns the frozen last reading, so late
    /// readers never observe time moving on a dead utterance.
    pub fn elapsed(&self) -> Duration {
        let inner = self.inner.lock();
        if let Some(frozen) = inner.frozen {
            return frozen;
        }
        Self::current(&inner.source)
    }

    fn current(source: &TimeSource) -> Duration {
        match source {
            TimeSource::Monotonic {
                started_at,
                paused_at,
                paused_total,
            } => {
                let reference = paused_at.unwrap_or_else(Instant::now);
                reference
                    .duration_since(*started_at)
                    .saturating_sub(*paused_total)
            },
            TimeSource::Reported { position } => *position,
        }
    }

    /// Record a playback-position report from the audio device
    pub fn set_position(&self, position: Duration) {
        let mut inner = self.inner.lock();
        if inner.frozen.is_some() {
            return;
        }
        if let TimeSource::Reported { position: p } = &mut inner.source {
            *p = position;
        }
    }

    /// Pause the clock together with the audio device
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if inner.frozen.is_some() {
            return;
        }
        if let TimeSource::Monotonic { paused_at, .. } = &mut inner.source {
            if paused_at.is_none() {
                *paused_at = Some(Instant::now());
            }
        }
    }

    /// Resume a paused clock
    pub fn resume(&self) {
        let mut inner = self.inner.lock();
        if inner.frozen.is_some() {
            return;
        }
        if let TimeSource::Monotonic {
            paused_at,
            paused_total,
            ..
        } = &mut inner.source
        {
            if let Some(at) = paused_at.take() {
                *paused_total += at.elapsed();
            }
        }
    }

    /// Invalidate the clock: playback was cancelled or finished.
    /// `elapsed()` freezes at its current reading.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        if inner.frozen.is_none() {
            inner.frozen = Some(Self::current(&inner.source));
        }
    }

    /// Whether the clock still tracks live playback
    pub fn is_valid(&self) -> bool {
        self.inner.lock().frozen.is_none()
    }
}

impl std::fmt::Debug for PlaybackClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackClock")
            .field("elapsed", &self.elapsed())
            .field("valid", &self.is_valid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_clock_positions() {
        let clock = PlaybackClock::reported();
        assert_eq!(clock.elapsed(), Duration::ZERO);

        clock.set_position(Duration::from_millis(250));
        assert_eq!(clock.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalidate_freezes_elapsed() {
        let clock = PlaybackClock::reported();
        clock.set_position(Duration::from_millis(800));
        clock.invalidate();

        assert!(!clock.is_valid());
        assert_eq!(clock.elapsed(), Duration::from_millis(800));

        // Position reports after invalidation are ignored
        clock.set_position(Duration::from_millis(2000));
        assert_eq!(clock.elapsed(), Duration::from_millis(800));
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = PlaybackClock::started();
        std::thread::sleep(Duration::from_millis(10));
        assert!(clock.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_pause_stops_time() {
        let clock = PlaybackClock::started();
        clock.pause();
        let at_pause = clock.elapsed();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(clock.elapsed(), at_pause);

        clock.resume();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.elapsed() > at_pause);
    }
}
