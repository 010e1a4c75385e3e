//! Schedulers: handles to execution contexts.
//!
//! A [`Scheduler`] is a cheaply cloneable handle that produces senders which
//! complete on its execution context. Schedulers that also know about time
//! implement [`TimeScheduler`].
//!
//! This module also provides the *forwarding* senders returned by
//! [`schedule`], [`schedule_after`] and [`schedule_at`]. These do not name a
//! scheduler at all: when connected, they ask the receiver's environment for
//! its scheduler (with [`GetScheduler`]) and delegate to it. Connecting one
//! of them to a receiver that cannot answer that query is a compile-time
//! error.
use crate::{query::GetScheduler, Connect, Query, Sender};
use core::{convert::Infallible, fmt, marker::PhantomData, ops::Add};

mod inline;

pub use self::inline::{InlineOperation, InlineScheduler, ScheduleInline};

/// A handle to an execution context.
pub trait Scheduler: Clone {
    /// The sender returned by [`Scheduler::schedule`].
    type Sender: Sender<Output = ()>;

    /// Returns a sender that completes with `()` on this scheduler's
    /// execution context.
    fn schedule(&self) -> Self::Sender;
}

/// A scheduler with a clock.
///
/// Implementations must provide [`now`](Self::now) and
/// [`schedule_at`](Self::schedule_at). [`schedule_after`] has a default
/// implementation in terms of those two, which schedulers with a cheaper
/// way to express a relative deadline may override.
///
/// [`schedule_after`]: Self::schedule_after
pub trait TimeScheduler: Scheduler {
    /// A point in time on this scheduler's clock.
    type TimePoint: Add<Self::Duration, Output = Self::TimePoint>;

    /// A span of time on this scheduler's clock.
    type Duration;

    /// The sender returned by [`schedule_at`](Self::schedule_at) and
    /// [`schedule_after`](Self::schedule_after).
    type TimedSender: Sender<Output = ()>;

    /// Returns the current time on this scheduler's clock.
    fn now(&self) -> Self::TimePoint;

    /// Returns a sender that completes on this scheduler's execution context
    /// no earlier than `deadline`.
    fn schedule_at(&self, deadline: Self::TimePoint) -> Self::TimedSender;

    /// Returns a sender that completes on this scheduler's execution context
    /// once `delay` has elapsed.
    fn schedule_after(&self, delay: Self::Duration) -> Self::TimedSender {
        self.schedule_at(self.now() + delay)
    }
}

/// The scheduler in the environment of a receiver of type `R`.
pub type SchedulerOf<R> = <R as Query<GetScheduler>>::Output;

/// Returns the scheduler in the environment of `receiver`.
#[inline]
pub fn get_scheduler<R>(receiver: &R) -> SchedulerOf<R>
where
    R: Query<GetScheduler> + ?Sized,
    SchedulerOf<R>: Scheduler,
{
    receiver.query(GetScheduler)
}

/// Returns the current time on `scheduler`'s clock.
#[inline]
pub fn now<S>(scheduler: &S) -> S::TimePoint
where
    S: TimeScheduler + ?Sized,
{
    scheduler.now()
}

/// Returns a sender that completes on the receiver's scheduler.
///
/// The returned sender's error payload is [`Infallible`]; use
/// [`Schedule::new`] if the receiver's scheduler can fail.
#[must_use]
pub fn schedule() -> Schedule {
    Schedule::new()
}

/// Returns a sender that completes on the receiver's scheduler once `delay`
/// has elapsed.
#[must_use]
pub fn schedule_after<D>(delay: D) -> ScheduleAfter<D> {
    ScheduleAfter::new(delay)
}

/// Returns a sender that completes on the receiver's scheduler no earlier
/// than `deadline`.
#[must_use]
pub fn schedule_at<T>(deadline: T) -> ScheduleAt<T> {
    ScheduleAt::new(deadline)
}

/// Forwards to [`Scheduler::schedule`] on the receiver's scheduler.
///
/// Returned by [`schedule`].
#[must_use = "senders do nothing unless connected and started"]
pub struct Schedule<E = Infallible> {
    _error: PhantomData<fn() -> E>,
}

/// Forwards to [`TimeScheduler::schedule_after`] on the receiver's
/// scheduler.
///
/// Returned by [`schedule_after`].
#[must_use = "senders do nothing unless connected and started"]
pub struct ScheduleAfter<D, E = Infallible> {
    delay: D,
    _error: PhantomData<fn() -> E>,
}

/// Forwards to [`TimeScheduler::schedule_at`] on the receiver's scheduler.
///
/// Returned by [`schedule_at`].
#[must_use = "senders do nothing unless connected and started"]
pub struct ScheduleAt<T, E = Infallible> {
    deadline: T,
    _error: PhantomData<fn() -> E>,
}

// === impl Schedule ===

impl<E> Schedule<E> {
    /// Returns a forwarding sender whose error payload is `E`.
    pub const fn new() -> Self {
        Self {
            _error: PhantomData,
        }
    }
}

impl<E> Default for Schedule<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Schedule<E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<E> Copy for Schedule<E> {}

impl<E> Sender for Schedule<E> {
    type Output = ();
    type Error = E;
}

impl<E, R> Connect<R> for Schedule<E>
where
    R: Query<GetScheduler>,
    SchedulerOf<R>: Scheduler,
    <SchedulerOf<R> as Scheduler>::Sender: Connect<R> + Sender<Error = E>,
{
    type Operation = <<SchedulerOf<R> as Scheduler>::Sender as Connect<R>>::Operation;

    fn connect(self, receiver: R) -> Self::Operation {
        let sender = get_scheduler(&receiver).schedule();
        sender.connect(receiver)
    }
}

impl<E> fmt::Debug for Schedule<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Schedule")
    }
}

// === impl ScheduleAfter ===

impl<D, E> ScheduleAfter<D, E> {
    /// Returns a forwarding sender for `delay` whose error payload is `E`.
    pub const fn new(delay: D) -> Self {
        Self {
            delay,
            _error: PhantomData,
        }
    }
}

impl<D: Clone, E> Clone for ScheduleAfter<D, E> {
    fn clone(&self) -> Self {
        Self::new(self.delay.clone())
    }
}

impl<D, E> Sender for ScheduleAfter<D, E> {
    type Output = ();
    type Error = E;
}

impl<D, E, R> Connect<R> for ScheduleAfter<D, E>
where
    R: Query<GetScheduler>,
    SchedulerOf<R>: TimeScheduler<Duration = D>,
    <SchedulerOf<R> as TimeScheduler>::TimedSender: Connect<R> + Sender<Error = E>,
{
    type Operation = <<SchedulerOf<R> as TimeScheduler>::TimedSender as Connect<R>>::Operation;

    fn connect(self, receiver: R) -> Self::Operation {
        let sender = get_scheduler(&receiver).schedule_after(self.delay);
        sender.connect(receiver)
    }
}

impl<D: fmt::Debug, E> fmt::Debug for ScheduleAfter<D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleAfter")
            .field("delay", &self.delay)
            .finish()
    }
}

// === impl ScheduleAt ===

impl<T, E> ScheduleAt<T, E> {
    /// Returns a forwarding sender for `deadline` whose error payload is
    /// `E`.
    pub const fn new(deadline: T) -> Self {
        Self {
            deadline,
            _error: PhantomData,
        }
    }
}

impl<T: Clone, E> Clone for ScheduleAt<T, E> {
    fn clone(&self) -> Self {
        Self::new(self.deadline.clone())
    }
}

impl<T, E> Sender for ScheduleAt<T, E> {
    type Output = ();
    type Error = E;
}

impl<T, E, R> Connect<R> for ScheduleAt<T, E>
where
    R: Query<GetScheduler>,
    SchedulerOf<R>: TimeScheduler<TimePoint = T>,
    <SchedulerOf<R> as TimeScheduler>::TimedSender: Connect<R> + Sender<Error = E>,
{
    type Operation = <<SchedulerOf<R> as TimeScheduler>::TimedSender as Connect<R>>::Operation;

    fn connect(self, receiver: R) -> Self::Operation {
        let sender = get_scheduler(&receiver).schedule_at(self.deadline);
        sender.connect(receiver)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for ScheduleAt<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleAt")
            .field("deadline", &self.deadline)
            .finish()
    }
}
