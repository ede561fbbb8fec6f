//! Self-rescheduling refresh timer.
//!
//! The timer owns one tokio task. Each time the deadline passes it calls the
//! tick callback and schedules the next deadline one period later. The
//! callback must not block: it is expected to spawn the actual cycle.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Delay before the first tick, and before a tick requested out of band.
pub const KICKOFF_DELAY: Duration = Duration::from_secs(1);

/// Stand-in deadline for periods too long to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay).unwrap_or(now + FAR_FUTURE)
}

#[derive(Debug, Clone, Copy)]
enum TimerCommand {
    FireIn(Duration),
    SetPeriod(Duration),
}

/// Sends reschedule requests to a running [`RefreshTimer`]. Requests to a
/// timer that has since been dropped are ignored.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    commands: mpsc::UnboundedSender<TimerCommand>,
}

impl TimerHandle {
    /// Next tick after `delay`; later ticks keep the configured period.
    pub fn fire_in(&self, delay: Duration) {
        let _ = self.commands.send(TimerCommand::FireIn(delay));
    }

    /// Change the period. A pending deadline further away than one new
    /// period is pulled in.
    pub fn set_period(&self, period: Duration) {
        let _ = self.commands.send(TimerCommand::SetPeriod(period));
    }
}

pub struct RefreshTimer {
    handle: TimerHandle,
    task: JoinHandle<()>,
}

impl RefreshTimer {
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(period: Duration, first_delay: Duration, on_tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(period, first_delay, rx, on_tick));

        Self {
            handle: TimerHandle { commands: tx },
            task,
        }
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    pub fn fire_in(&self, delay: Duration) {
        self.handle.fire_in(delay);
    }

    pub fn set_period(&self, period: Duration) {
        self.handle.set_period(period);
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<F>(
    mut period: Duration,
    first_delay: Duration,
    mut commands: mpsc::UnboundedReceiver<TimerCommand>,
    on_tick: F,
) where
    F: Fn() + Send + 'static,
{
    let mut next = deadline(first_delay);

    loop {
        tokio::select! {
            _ = sleep_until(next) => {
                on_tick();
                next = deadline(period);
            }
            command = commands.recv() => match command {
                Some(TimerCommand::FireIn(delay)) => {
                    next = deadline(delay);
                }
                Some(TimerCommand::SetPeriod(new_period)) => {
                    debug!("Timer period {:?} -> {:?}", period, new_period);
                    period = new_period;
                    next = next.min(deadline(period));
                }
                None => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_timer(period: Duration, first: Duration) -> (Arc<AtomicUsize>, RefreshTimer) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let timer = RefreshTimer::arm(period, first, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (ticks, timer)
    }

    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_kickoff_then_periodic() {
        let (ticks, _timer) = counting_timer(Duration::from_secs(60), KICKOFF_DELAY);

        advance(Duration::from_millis(500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        advance(Duration::from_millis(600)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        advance(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_in_preserves_period() {
        let (ticks, timer) = counting_timer(Duration::from_secs(60), Duration::from_secs(60));

        timer.fire_in(KICKOFF_DELAY);
        advance(Duration::from_millis(1100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        advance(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        advance(Duration::from_secs(31)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shorter_period_pulls_deadline_in() {
        let (ticks, timer) = counting_timer(Duration::from_secs(600), Duration::from_secs(600));

        timer.set_period(Duration::from_secs(10));
        advance(Duration::from_secs(11)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        advance(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_period_does_not_overflow_the_clock() {
        let (ticks, timer) = counting_timer(Duration::from_secs(u64::MAX), KICKOFF_DELAY);

        advance(Duration::from_millis(1100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        timer.set_period(Duration::from_secs(u64::MAX));
        advance(Duration::from_secs(3600)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_disarms() {
        let (ticks, timer) = counting_timer(Duration::from_secs(5), KICKOFF_DELAY);
        let handle = timer.handle();
        drop(timer);

        handle.fire_in(Duration::ZERO);
        advance(Duration::from_secs(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
