//! Senders that complete immediately with a fixed signal.
//!
//! These are the simplest possible senders: each one completes its receiver
//! synchronously, inside [`start`](crate::OperationState::start), with the
//! signal it was constructed with.
use crate::{Connect, OperationState, SetDone, SetError, SetValue, Sender};
use core::{convert::Infallible, fmt, marker::PhantomData, pin::Pin};
use pin_project::pin_project;

/// Returns a sender that completes with `value`.
#[must_use]
pub fn just<T>(value: T) -> Just<T> {
    Just { value }
}

/// Returns a sender that fails with `error`.
///
/// The sender's value payload is `()`; use [`JustError::new`] to pick a
/// different one.
#[must_use]
pub fn just_error<E>(error: E) -> JustError<E> {
    JustError::new(error)
}

/// Returns a sender that completes with the done signal.
///
/// The sender's payloads are `()` and [`Infallible`]; use [`JustDone::new`]
/// to pick different ones.
#[must_use]
pub fn just_done() -> JustDone {
    JustDone::new()
}

/// A sender that completes with a value.
///
/// Returned by [`just`].
#[derive(Clone, Debug)]
#[must_use = "senders do nothing unless connected and started"]
pub struct Just<T> {
    value: T,
}

/// A sender that completes with an error.
///
/// Returned by [`just_error`].
#[must_use = "senders do nothing unless connected and started"]
pub struct JustError<E, T = ()> {
    error: E,
    _output: PhantomData<fn() -> T>,
}

/// A sender that completes with the done signal.
///
/// Returned by [`just_done`].
#[must_use = "senders do nothing unless connected and started"]
pub struct JustDone<T = (), E = Infallible> {
    _payloads: PhantomData<fn() -> (T, E)>,
}

/// The operation state of the senders in this module.
#[pin_project]
pub struct Ready<S, R> {
    state: Option<(S, R)>,
}

impl<S, R> Ready<S, R> {
    pub(crate) fn new(signal: S, receiver: R) -> Self {
        Self {
            state: Some((signal, receiver)),
        }
    }

    pub(crate) fn take(self: Pin<&mut Self>) -> Option<(S, R)> {
        let state = self.project().state.take();
        debug_assert!(state.is_some(), "operation started twice");
        state
    }
}

impl<S, R> fmt::Debug for Ready<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ready")
            .field("started", &self.state.is_none())
            .finish()
    }
}

// === impl Just ===

impl<T> Sender for Just<T> {
    type Output = T;
    type Error = Infallible;
}

impl<T, R> Connect<R> for Just<T>
where
    R: SetValue<T>,
{
    type Operation = Ready<Value<T>, R>;

    fn connect(self, receiver: R) -> Self::Operation {
        Ready::new(Value(self.value), receiver)
    }
}

#[doc(hidden)]
#[derive(Debug)]
pub struct Value<T>(T);

impl<T, R> OperationState for Ready<Value<T>, R>
where
    R: SetValue<T>,
{
    fn start(self: Pin<&mut Self>) {
        if let Some((Value(value), receiver)) = self.take() {
            receiver.set_value(value);
        }
    }
}

// === impl JustError ===

impl<E, T> JustError<E, T> {
    /// Returns a sender that fails with `error`, and whose value payload is
    /// `T`.
    pub fn new(error: E) -> Self {
        Self {
            error,
            _output: PhantomData,
        }
    }
}

impl<E, T> Sender for JustError<E, T> {
    type Output = T;
    type Error = E;
}

impl<E, T, R> Connect<R> for JustError<E, T>
where
    R: SetError<E>,
{
    type Operation = Ready<Error<E>, R>;

    fn connect(self, receiver: R) -> Self::Operation {
        Ready::new(Error(self.error), receiver)
    }
}

#[doc(hidden)]
#[derive(Debug)]
pub struct Error<E>(E);

impl<E, R> OperationState for Ready<Error<E>, R>
where
    R: SetError<E>,
{
    fn start(self: Pin<&mut Self>) {
        if let Some((Error(error), receiver)) = self.take() {
            receiver.set_error(error);
        }
    }
}

impl<E: fmt::Debug, T> fmt::Debug for JustError<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JustError")
            .field("error", &self.error)
            .finish()
    }
}

// === impl JustDone ===

impl<T, E> JustDone<T, E> {
    /// Returns a sender that completes with the done signal, and whose
    /// payloads are `T` and `E`.
    pub const fn new() -> Self {
        Self {
            _payloads: PhantomData,
        }
    }
}

impl<T, E> Default for JustDone<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Sender for JustDone<T, E> {
    type Output = T;
    type Error = E;
}

impl<T, E, R> Connect<R> for JustDone<T, E>
where
    R: SetDone,
{
    type Operation = Ready<Done, R>;

    fn connect(self, receiver: R) -> Self::Operation {
        Ready::new(Done, receiver)
    }
}

#[doc(hidden)]
#[derive(Debug)]
pub struct Done;

impl<R> OperationState for Ready<Done, R>
where
    R: SetDone,
{
    fn start(self: Pin<&mut Self>) {
        if let Some((Done, receiver)) = self.take() {
            receiver.set_done();
        }
    }
}

impl<T, E> fmt::Debug for JustDone<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JustDone")
    }
}
