//! Trailing-edge debounce.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::task::TaskHandle;

/// Create a debouncer and the receiver for its settled values.
///
/// Every value pushed into the [`Debouncer`] restarts a `delay` timer. The
/// receiver gets the most recent value once no new value has arrived for
/// `delay`. Intermediate values are discarded.
///
/// Must be called inside a Tokio runtime.
///
/// # Example
///
/// ```no_run
/// use cadence::scheduler::debounce;
/// use std::time::Duration;
///
/// # async fn demo() {
/// let (search, mut settled) = debounce::<String>(Duration::from_millis(150));
/// search.push("le".into());
/// search.push("lead".into());
///
/// assert_eq!(settled.recv().await.as_deref(), Some("lead"));
/// # }
/// ```
pub fn debounce<T>(delay: Duration) -> (Debouncer<T>, mpsc::UnboundedReceiver<T>)
where
    T: Send + 'static,
{
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (output_tx, output_rx) = mpsc::unbounded_channel();

    let task = TaskHandle::spawn("debounce", move |token| {
        run_debounce(delay, input_rx, output_tx, token)
    });

    (
        Debouncer {
            delay,
            input: input_tx,
            task,
        },
        output_rx,
    )
}

/// Input side of a debounce pipeline. See [`debounce`].
///
/// Dropping the debouncer (or calling [`cancel`](Self::cancel)) discards any
/// pending value; nothing fires after teardown.
pub struct Debouncer<T> {
    delay: Duration,
    input: mpsc::UnboundedSender<T>,
    task: TaskHandle,
}

impl<T> Debouncer<T> {
    /// Record a new input value and restart the quiescence timer.
    ///
    /// Returns `false` if the debouncer has been cancelled.
    pub fn push(&self, value: T) -> bool {
        if self.task.is_cancelled() {
            return false;
        }
        self.input.send(value).is_ok()
    }

    /// Cancel the pending timer and stop accepting input.
    pub fn cancel(&self) {
        self.task.cancel();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }

    /// Configured quiescence delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("task", &self.task)
            .finish()
    }
}

async fn run_debounce<T>(
    delay: Duration,
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
    token: CancellationToken,
) {
    let mut pending: Option<T> = None;
    let mut deadline = Instant::now();

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                if pending.is_some() {
                    tracing::trace!("Debounce cancelled with a pending value; discarding");
                }
                break;
            }

            received = input.recv() => match received {
                Some(value) => {
                    pending = Some(value);
                    deadline = Instant::now() + delay;
                }
                None => break,
            },

            _ = tokio::time::sleep_until(deadline), if pending.is_some() => {
                if let Some(value) = pending.take() {
                    if output.send(value).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_yields_single_trailing_update() {
        let (debouncer, mut settled) = debounce::<u32>(Duration::from_millis(150));

        // 5 calls within 10ms
        for value in 1..=4 {
            debouncer.push(value);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        debouncer.push(5);
        let final_call = Instant::now();

        tokio::time::sleep(Duration::from_millis(149)).await;
        assert!(settled.try_recv().is_err(), "fired before quiescence");

        let value = settled.recv().await;
        assert_eq!(value, Some(5));
        assert!(Instant::now().duration_since(final_call) >= Duration::from_millis(150));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(settled.try_recv().is_err(), "emitted more than once");
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_emit_separately() {
        let (debouncer, mut settled) = debounce::<&'static str>(Duration::from_millis(50));

        debouncer.push("first");
        assert_eq!(settled.recv().await, Some("first"));

        debouncer.push("second");
        assert_eq!(settled.recv().await, Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (debouncer, mut settled) = debounce::<u32>(Duration::from_millis(100));

        debouncer.push(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.cancel();

        assert!(!debouncer.push(2));
        assert!(debouncer.is_cancelled());

        // The worker exits and closes the output channel without emitting.
        assert_eq!(settled.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_prevents_firing() {
        let (debouncer, mut settled) = debounce::<u32>(Duration::from_millis(100));

        debouncer.push(1);
        drop(debouncer);

        assert_eq!(settled.recv().await, None);
    }
}
