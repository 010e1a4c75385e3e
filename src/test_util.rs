use crate::{
    materialize::Notification,
    query::GetScheduler,
    scheduler::{InlineScheduler, Scheduler, TimeScheduler},
    Query, SetDone, SetError, SetValue,
};
use std::{
    boxed::Box,
    collections::VecDeque,
    sync::{Arc, Mutex},
    vec::Vec,
};

/// A receiver that records every completion it receives.
pub(crate) struct Recorder<T, E, S = InlineScheduler> {
    log: Log<T, E>,
    scheduler: S,
}

/// The completions recorded by a [`Recorder`].
pub(crate) struct Log<T, E>(Arc<Mutex<Vec<Notification<T, E>>>>);

impl<T, E> Recorder<T, E> {
    pub(crate) fn new() -> (Self, Log<T, E>) {
        Self::with_scheduler(InlineScheduler)
    }
}

impl<T, E, S> Recorder<T, E, S> {
    pub(crate) fn with_scheduler(scheduler: S) -> (Self, Log<T, E>) {
        let log = Log(Arc::new(Mutex::new(Vec::new())));
        let recorder = Self {
            log: Log(log.0.clone()),
            scheduler,
        };
        (recorder, log)
    }

    fn record(self, notification: Notification<T, E>) {
        self.log.0.lock().unwrap().push(notification);
    }
}

impl<T, E, S> SetValue<T> for Recorder<T, E, S> {
    fn set_value(self, value: T) {
        self.record(Notification::Value(value))
    }
}

impl<T, E, S> SetError<E> for Recorder<T, E, S> {
    fn set_error(self, error: E) {
        self.record(Notification::Error(error))
    }
}

impl<T, E, S> SetDone for Recorder<T, E, S> {
    fn set_done(self) {
        self.record(Notification::Done)
    }
}

impl<T, E, S: Scheduler> Query<GetScheduler> for Recorder<T, E, S> {
    type Output = S;

    fn query(&self, _: GetScheduler) -> S {
        self.scheduler.clone()
    }
}

impl<T: Clone, E: Clone> Log<T, E> {
    /// Returns every completion recorded so far.
    pub(crate) fn get(&self) -> Vec<Notification<T, E>> {
        self.0.lock().unwrap().clone()
    }

    /// Returns the single completion recorded, panicking if there were none
    /// or more than one.
    #[track_caller]
    pub(crate) fn single(&self) -> Notification<T, E> {
        let log = self.get();
        assert_eq!(log.len(), 1, "expected exactly one completion");
        log.into_iter().next().unwrap()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

/// A scheduler with a manually advanced clock.
///
/// Every sender it returns completes inline; `schedule_at` records the
/// deadline it was given.
#[derive(Clone, Debug, Default)]
pub(crate) struct ManualClock {
    state: Arc<Mutex<ClockState>>,
}

#[derive(Debug, Default)]
struct ClockState {
    now: u64,
    deadlines: Vec<u64>,
}

impl ManualClock {
    pub(crate) fn at(now: u64) -> Self {
        let clock = Self::default();
        clock.state.lock().unwrap().now = now;
        clock
    }

    pub(crate) fn deadlines(&self) -> Vec<u64> {
        self.state.lock().unwrap().deadlines.clone()
    }
}

impl Scheduler for ManualClock {
    type Sender = <InlineScheduler as Scheduler>::Sender;

    fn schedule(&self) -> Self::Sender {
        InlineScheduler.schedule()
    }
}

impl TimeScheduler for ManualClock {
    type TimePoint = u64;
    type Duration = u64;
    type TimedSender = <InlineScheduler as Scheduler>::Sender;

    fn now(&self) -> u64 {
        self.state.lock().unwrap().now
    }

    fn schedule_at(&self, deadline: u64) -> Self::TimedSender {
        self.state.lock().unwrap().deadlines.push(deadline);
        InlineScheduler.schedule()
    }
}

/// A sender that completes with its receiver's answer to query `K`.
///
/// The query is made when the sender is connected.
pub(crate) struct ReadQuery<K, V> {
    key: K,
    _value: core::marker::PhantomData<fn() -> V>,
}

pub(crate) fn read_query<K, V>(key: K) -> ReadQuery<K, V> {
    ReadQuery {
        key,
        _value: core::marker::PhantomData,
    }
}

impl<K, V> crate::Sender for ReadQuery<K, V> {
    type Output = V;
    type Error = core::convert::Infallible;
}

impl<K, V, R> crate::Connect<R> for ReadQuery<K, V>
where
    R: Query<K, Output = V> + SetValue<V>,
{
    type Operation = crate::just::Ready<crate::just::Value<V>, R>;

    fn connect(self, receiver: R) -> Self::Operation {
        let answer = receiver.query(self.key);
        crate::Connect::connect(crate::just::just(answer), receiver)
    }
}

/// A scheduler whose operations run only when [`RunQueue::run_all`] is
/// called.
#[derive(Clone, Default)]
pub(crate) struct RunQueue {
    tasks: Arc<Mutex<VecDeque<Box<dyn FnOnce() + Send>>>>,
}

/// The sender returned by [`RunQueue::schedule`].
pub(crate) struct Deferred {
    queue: RunQueue,
}

#[pin_project::pin_project]
pub(crate) struct DeferredOperation<R> {
    queue: RunQueue,
    receiver: Option<R>,
}

impl RunQueue {
    /// Runs queued operations, including ones queued while running, until
    /// none are left. Returns how many ran.
    pub(crate) fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.tasks.lock().unwrap().pop_front();
            let Some(task) = task else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }
}

impl Scheduler for RunQueue {
    type Sender = Deferred;

    fn schedule(&self) -> Deferred {
        Deferred {
            queue: self.clone(),
        }
    }
}

impl crate::Sender for Deferred {
    type Output = ();
    type Error = core::convert::Infallible;
}

impl<R> crate::Connect<R> for Deferred
where
    R: SetValue<()> + Send + 'static,
{
    type Operation = DeferredOperation<R>;

    fn connect(self, receiver: R) -> Self::Operation {
        DeferredOperation {
            queue: self.queue,
            receiver: Some(receiver),
        }
    }
}

impl<R> crate::OperationState for DeferredOperation<R>
where
    R: SetValue<()> + Send + 'static,
{
    fn start(self: core::pin::Pin<&mut Self>) {
        let this = self.project();
        let receiver = this.receiver.take().unwrap();
        this.queue
            .tasks
            .lock()
            .unwrap()
            .push_back(Box::new(move || receiver.set_value(())));
    }
}

/// A scheduler that cancels everything scheduled on it.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Cancelling;

impl Scheduler for Cancelling {
    type Sender = crate::just::JustDone;

    fn schedule(&self) -> Self::Sender {
        crate::just::JustDone::new()
    }
}
