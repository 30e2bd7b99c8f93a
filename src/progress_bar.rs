//! Progress reporting for long-running loops.
//!
//! Long operations (all-pairs shortest distances, spatial index construction) drive a
//! [`Progress`] handle once per iteration.
//!
//! * With the `progress` feature, the handle owns an `indicatif` bar whose message shows
//!   the last and smoothed iteration times measured by an [`IterTimer`].
//! * Without it, the handle logs at `info` level every 10 %.
//!
//! The smoothed time is an **exponential moving average**:
//! `ema ← α·dt + (1–α)·ema`, with `α ∈ (0,1]`; `α = 1` disables smoothing.
//!
//! ```rust, no_run
//! use tracklib::progress_bar::Progress;
//!
//! let mut progress = Progress::new("routing", 1000);
//! for _ in 0..1000 {
//!     // ... some expensive work ...
//!     progress.tick();
//! }
//! progress.finish();
//! ```
use std::time::{Duration, Instant};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(not(feature = "progress"))]
use log::info;

/// Per-iteration durations with an exponential moving average.
pub struct IterTimer {
    last: Instant,
    ema_ns: f64,
    alpha: f64,
    count: u64,
}

impl IterTimer {
    pub fn new(alpha: f64) -> Self {
        Self {
            last: Instant::now(),
            ema_ns: 0.0,
            alpha,
            count: 0,
        }
    }

    /// Duration since the previous tick (or since construction).
    #[inline]
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        self.count += 1;

        let dt_ns = dt.as_nanos() as f64;
        self.ema_ns = if self.count == 1 {
            dt_ns
        } else {
            self.alpha * dt_ns + (1.0 - self.alpha) * self.ema_ns
        };
        dt
    }

    #[inline]
    pub fn avg(&self) -> Duration {
        if self.count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.ema_ns as u64)
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Human-readable duration: `"253µs"`, `"42ms"` or `"3.14s"`.
#[inline]
pub fn fmt_dur(d: Duration) -> String {
    let us = d.as_micros();
    if us < 1_000 {
        format!("{us}µs")
    } else {
        let ms = d.as_millis();
        if ms < 1_000 {
            format!("{ms}ms")
        } else {
            format!("{:.2}s", d.as_secs_f32())
        }
    }
}

/// Progress of a loop of known length.
pub struct Progress {
    label: String,
    total: u64,
    timer: IterTimer,
    #[cfg(feature = "progress")]
    bar: ProgressBar,
    #[cfg(not(feature = "progress"))]
    next_report: u64,
}

impl Progress {
    pub fn new(label: &str, total: usize) -> Self {
        let total = total.max(1) as u64;
        #[cfg(feature = "progress")]
        let bar = {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::with_template(
                "{prefix} {bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | ETA {eta_precise} | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style);
            pb.set_prefix(label.to_string());
            pb.enable_steady_tick(Duration::from_millis(200));
            pb
        };
        Progress {
            label: label.to_string(),
            total,
            timer: IterTimer::new(0.2),
            #[cfg(feature = "progress")]
            bar,
            #[cfg(not(feature = "progress"))]
            next_report: 1,
        }
    }

    /// Record one finished iteration.
    pub fn tick(&mut self) {
        let last = self.timer.tick();
        #[cfg(feature = "progress")]
        {
            self.bar.set_message(format!(
                "last: {}, avg: {}",
                fmt_dur(last),
                fmt_dur(self.timer.avg())
            ));
            self.bar.inc(1);
        }
        #[cfg(not(feature = "progress"))]
        {
            let _ = last;
            let done = self.timer.count();
            // report at every crossed decile
            if done * 10 >= self.next_report * self.total {
                info!(
                    "{}: {}% ({}/{}), avg {} per item",
                    self.label,
                    done * 100 / self.total,
                    done.min(self.total),
                    self.total,
                    fmt_dur(self.timer.avg())
                );
                while self.next_report <= 10 && done * 10 >= self.next_report * self.total {
                    self.next_report += 1;
                }
            }
        }
    }

    pub fn finish(self) {
        #[cfg(feature = "progress")]
        self.bar.finish_and_clear();
        log::debug!("{}: {} iterations done", self.label, self.timer.count());
    }
}

#[cfg(test)]
mod progress_bar_test {
    use super::*;

    #[test]
    fn test_fmt_dur() {
        assert_eq!(fmt_dur(Duration::from_micros(253)), "253µs");
        assert_eq!(fmt_dur(Duration::from_millis(42)), "42ms");
        assert_eq!(fmt_dur(Duration::from_millis(3140)), "3.14s");
    }

    #[test]
    fn test_timer_average() {
        let mut timer = IterTimer::new(1.0);
        assert_eq!(timer.avg(), Duration::from_nanos(0));
        let dt = timer.tick();
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.avg().as_nanos(), dt.as_nanos());
    }

    #[test]
    fn test_progress_runs_to_completion() {
        let mut p = Progress::new("test", 25);
        for _ in 0..25 {
            p.tick();
        }
        p.finish();
    }
}
