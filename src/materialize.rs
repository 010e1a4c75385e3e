//! Reifying completions as values.
//!
//! [`materialize`] turns every completion of a sender into a
//! [`Notification`] delivered on the value channel, so that callers can
//! store, compare, or inspect a completion without handling three separate
//! channels. [`dematerialize`] does the reverse, replaying a stored
//! notification on the channel it came from.
use crate::{Connect, Query, SetDone, SetError, SetValue, Sender};
use core::{convert::Infallible, fmt, marker::PhantomData};

/// A completion signal, reified as a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Notification<T, E> {
    /// The operation completed with a value.
    Value(T),
    /// The operation failed with an error.
    Error(E),
    /// The operation was cancelled.
    Done,
}

/// Returns a sender that completes with the notification of `sender`'s
/// completion.
///
/// If `sender` completes with a value `v`, the returned sender completes
/// with `Notification::Value(v)`; an error `e` becomes
/// `Notification::Error(e)`, and the done signal becomes
/// `Notification::Done`. Every one of these is delivered on the value
/// channel.
///
/// Building a notification moves the payload into it and cannot fail, so
/// the returned sender's error payload is [`Infallible`]: a materialized
/// sender never completes with an error. Materializing a sender twice
/// yields nested notifications, and no information is lost.
///
/// Environment queries made by `sender` are forwarded to the receiver that
/// the materialized sender is connected to.
#[must_use]
pub fn materialize<S>(sender: S) -> Materialize<S>
where
    S: Sender,
{
    Materialize { source: sender }
}

/// Returns a sender that replays the notification `sender` completes with.
///
/// `Notification::Value(v)` is delivered as a value, `Notification::Error(e)`
/// as an error, and `Notification::Done` as the done signal. If `sender`
/// itself completes with the done signal, that is forwarded as well.
#[must_use]
pub fn dematerialize<S, T, E>(sender: S) -> Dematerialize<S>
where
    S: Sender<Output = Notification<T, E>, Error = Infallible>,
{
    Dematerialize { source: sender }
}

/// Returned by [`materialize`].
#[derive(Clone, Debug)]
#[must_use = "senders do nothing unless connected and started"]
pub struct Materialize<S> {
    source: S,
}

/// The receiver a [`Materialize`]'s source is connected to.
pub struct MaterializeReceiver<R, T, E> {
    receiver: R,
    _payloads: PhantomData<fn(T, E)>,
}

/// Returned by [`dematerialize`].
#[derive(Clone, Debug)]
#[must_use = "senders do nothing unless connected and started"]
pub struct Dematerialize<S> {
    source: S,
}

/// The receiver a [`Dematerialize`]'s source is connected to.
#[derive(Debug)]
pub struct DematerializeReceiver<R> {
    receiver: R,
}

// === impl Notification ===

impl<T, E> Notification<T, E> {
    /// Returns `true` if this is a `Value` notification.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Returns `true` if this is an `Error` notification.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns `true` if this is a `Done` notification.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Delivers this notification to `receiver` on the matching channel.
    pub fn deliver<R>(self, receiver: R)
    where
        R: SetValue<T> + SetError<E> + SetDone,
    {
        match self {
            Self::Value(value) => receiver.set_value(value),
            Self::Error(error) => receiver.set_error(error),
            Self::Done => receiver.set_done(),
        }
    }
}

// === impl Materialize ===

impl<S> Sender for Materialize<S>
where
    S: Sender,
{
    type Output = Notification<S::Output, S::Error>;
    type Error = Infallible;
}

impl<S, R> Connect<R> for Materialize<S>
where
    S: Sender + Connect<MaterializeReceiver<R, <S as Sender>::Output, <S as Sender>::Error>>,
    R: SetValue<Notification<<S as Sender>::Output, <S as Sender>::Error>>,
{
    type Operation = S::Operation;

    fn connect(self, receiver: R) -> Self::Operation {
        self.source.connect(MaterializeReceiver {
            receiver,
            _payloads: PhantomData,
        })
    }
}

impl<R, T, E> SetValue<T> for MaterializeReceiver<R, T, E>
where
    R: SetValue<Notification<T, E>>,
{
    fn set_value(self, value: T) {
        self.receiver.set_value(Notification::Value(value))
    }
}

impl<R, T, E> SetError<E> for MaterializeReceiver<R, T, E>
where
    R: SetValue<Notification<T, E>>,
{
    fn set_error(self, error: E) {
        self.receiver.set_value(Notification::Error(error))
    }
}

impl<R, T, E> SetDone for MaterializeReceiver<R, T, E>
where
    R: SetValue<Notification<T, E>>,
{
    fn set_done(self) {
        self.receiver.set_value(Notification::Done)
    }
}

impl<Q, R, T, E> Query<Q> for MaterializeReceiver<R, T, E>
where
    R: Query<Q>,
{
    type Output = R::Output;

    #[inline]
    fn query(&self, key: Q) -> Self::Output {
        self.receiver.query(key)
    }
}

impl<R: fmt::Debug, T, E> fmt::Debug for MaterializeReceiver<R, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializeReceiver")
            .field("receiver", &self.receiver)
            .finish()
    }
}

// === impl Dematerialize ===

impl<S, T, E> Sender for Dematerialize<S>
where
    S: Sender<Output = Notification<T, E>, Error = Infallible>,
{
    type Output = T;
    type Error = E;
}

impl<S, T, E, R> Connect<R> for Dematerialize<S>
where
    S: Sender<Output = Notification<T, E>, Error = Infallible>
        + Connect<DematerializeReceiver<R>>,
    R: SetValue<T> + SetError<E> + SetDone,
{
    type Operation = S::Operation;

    fn connect(self, receiver: R) -> Self::Operation {
        self.source.connect(DematerializeReceiver { receiver })
    }
}

impl<R, T, E> SetValue<Notification<T, E>> for DematerializeReceiver<R>
where
    R: SetValue<T> + SetError<E> + SetDone,
{
    fn set_value(self, notification: Notification<T, E>) {
        notification.deliver(self.receiver)
    }
}

impl<R> SetError<Infallible> for DematerializeReceiver<R> {
    fn set_error(self, error: Infallible) {
        match error {}
    }
}

impl<R> SetDone for DematerializeReceiver<R>
where
    R: SetDone,
{
    fn set_done(self) {
        self.receiver.set_done()
    }
}

impl<Q, R> Query<Q> for DematerializeReceiver<R>
where
    R: Query<Q>,
{
    type Output = R::Output;

    #[inline]
    fn query(&self, key: Q) -> Self::Output {
        self.receiver.query(key)
    }
}
