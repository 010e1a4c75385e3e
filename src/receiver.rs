//! Receivers: the completion side of the sender/receiver protocol.
//!
//! A receiver is the value a caller hands to [`connect`](crate::connect)
//! along with a sender. When the resulting operation finishes, it signals
//! **exactly one** of three completion channels on the receiver:
//!
//! - [`SetValue::set_value`], with the sender's value payload;
//! - [`SetError::set_error`], with the sender's error payload;
//! - [`SetDone::set_done`], if the operation was cancelled.
//!
//! Each channel is a separate trait, so a receiver only has to implement the
//! channels that the senders it is connected to can actually signal. Every
//! channel method takes `self` by value: once a receiver has been completed,
//! it is gone, and it cannot be completed again.

/// The value completion channel of a receiver.
pub trait SetValue<T> {
    /// Completes the receiver with `value`.
    fn set_value(self, value: T);
}

/// The error completion channel of a receiver.
pub trait SetError<E> {
    /// Completes the receiver with `error`.
    fn set_error(self, error: E);
}

/// The done (cancellation) completion channel of a receiver.
pub trait SetDone {
    /// Completes the receiver without a value or an error.
    fn set_done(self);
}

/// A receiver that accepts every completion of a sender whose value payload
/// is `T` and whose error payload is `E`.
///
/// This trait is implemented for every type that implements all three
/// completion channels; it is never implemented manually.
pub trait Receiver<T, E>: SetValue<T> + SetError<E> + SetDone {}

impl<R, T, E> Receiver<T, E> for R where R: SetValue<T> + SetError<E> + SetDone {}

/// Completes `receiver` with `value`.
#[inline]
pub fn set_value<R, T>(receiver: R, value: T)
where
    R: SetValue<T>,
{
    receiver.set_value(value)
}

/// Completes `receiver` with `error`.
#[inline]
pub fn set_error<R, E>(receiver: R, error: E)
where
    R: SetError<E>,
{
    receiver.set_error(error)
}

/// Completes `receiver` with the done signal.
#[inline]
pub fn set_done<R>(receiver: R)
where
    R: SetDone,
{
    receiver.set_done()
}
