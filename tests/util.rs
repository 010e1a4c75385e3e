#![allow(dead_code)]

use hyphae::{
    scheduler::{InlineScheduler, Scheduler, TimeScheduler},
    Connect, GetScheduler, Notification, OperationState, Query, SetDone, SetError, SetValue,
    Sender,
};
use std::{
    convert::Infallible,
    pin::Pin,
    sync::mpsc,
    thread::{self, ThreadId},
    time::{Duration, Instant},
};

pub fn trace_init() {
    use tracing_subscriber::filter::{EnvFilter, LevelFilter};
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::TRACE.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A scheduler that completes every operation on a freshly spawned thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct NewThread;

#[derive(Debug)]
pub struct Spawn {
    deadline: Option<Instant>,
}

#[pin_project::pin_project]
pub struct SpawnOperation<R> {
    deadline: Option<Instant>,
    receiver: Option<R>,
}

impl Scheduler for NewThread {
    type Sender = Spawn;

    fn schedule(&self) -> Spawn {
        Spawn { deadline: None }
    }
}

impl TimeScheduler for NewThread {
    type TimePoint = Instant;
    type Duration = Duration;
    type TimedSender = Spawn;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_at(&self, deadline: Instant) -> Spawn {
        Spawn {
            deadline: Some(deadline),
        }
    }
}

impl Sender for Spawn {
    type Output = ();
    type Error = Infallible;
}

impl<R> Connect<R> for Spawn
where
    R: SetValue<()> + Send + 'static,
{
    type Operation = SpawnOperation<R>;

    fn connect(self, receiver: R) -> Self::Operation {
        SpawnOperation {
            deadline: self.deadline,
            receiver: Some(receiver),
        }
    }
}

impl<R> OperationState for SpawnOperation<R>
where
    R: SetValue<()> + Send + 'static,
{
    fn start(self: Pin<&mut Self>) {
        let this = self.project();
        let deadline = *this.deadline;
        let receiver = this.receiver.take().expect("operation started twice");
        thread::spawn(move || {
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                }
            }
            receiver.set_value(());
        });
    }
}

/// A completion, and the thread it happened on.
#[derive(Debug)]
pub struct Observed<T, E> {
    pub notification: Notification<T, E>,
    pub thread: ThreadId,
}

/// A receiver that reports its completion over a channel.
pub struct Observer<T, E> {
    tx: mpsc::Sender<Observed<T, E>>,
}

pub fn observer<T, E>() -> (Observer<T, E>, mpsc::Receiver<Observed<T, E>>) {
    let (tx, rx) = mpsc::channel();
    (Observer { tx }, rx)
}

impl<T, E> Observer<T, E> {
    fn observe(self, notification: Notification<T, E>) {
        let observed = Observed {
            notification,
            thread: thread::current().id(),
        };
        self.tx.send(observed).expect("observer dropped");
    }
}

impl<T, E> SetValue<T> for Observer<T, E> {
    fn set_value(self, value: T) {
        self.observe(Notification::Value(value))
    }
}

impl<T, E> SetError<E> for Observer<T, E> {
    fn set_error(self, error: E) {
        self.observe(Notification::Error(error))
    }
}

impl<T, E> SetDone for Observer<T, E> {
    fn set_done(self) {
        self.observe(Notification::Done)
    }
}

impl<T, E> Query<GetScheduler> for Observer<T, E> {
    type Output = InlineScheduler;

    fn query(&self, _: GetScheduler) -> InlineScheduler {
        InlineScheduler
    }
}

/// Waits for an observed completion, failing the test if none arrives.
#[track_caller]
pub fn wait<T, E>(rx: &mpsc::Receiver<Observed<T, E>>) -> Observed<T, E> {
    rx.recv_timeout(Duration::from_secs(10))
        .expect("operation did not complete")
}
