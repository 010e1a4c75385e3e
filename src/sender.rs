//! Senders and operation states.
//!
//! A [`Sender`] describes an asynchronous operation that has not started
//! yet. Nothing happens until the sender is [connected](Connect) to a
//! receiver, producing an [`OperationState`], and that operation state is
//! [started](OperationState::start).
//!
//! The operation state owns everything the operation needs, including the
//! receiver. It is started through a pinned reference, so it stays at the
//! same address from the moment it starts until it completes; operations
//! are free to hand out pointers to themselves (for example, by linking
//! themselves into an intrusive queue) for that long. An operation state
//! must not be dropped between `start` and the moment its receiver is
//! completed.
use core::pin::Pin;

/// A description of an asynchronous operation.
///
/// `Output` is the payload of a successful completion: a single value, a
/// tuple of values, or `()` when the operation produces nothing. `Error`
/// is the payload of a failed completion; senders that cannot fail use
/// [`core::convert::Infallible`].
pub trait Sender {
    /// The value payload this sender completes with.
    type Output;

    /// The error payload this sender may complete with.
    type Error;
}

/// A sender that can be connected to a receiver of type `R`.
///
/// Connecting never begins the operation. The bounds on `R` in each
/// implementation state which completion channels (and which environment
/// queries) the operation needs from its receiver; connecting to a receiver
/// that lacks one is a compile-time error.
pub trait Connect<R>: Sender {
    /// The operation state produced by connecting to `R`.
    type Operation: OperationState;

    /// Connects this sender to `receiver`.
    fn connect(self, receiver: R) -> Self::Operation;
}

/// A connected, startable operation.
pub trait OperationState {
    /// Starts the operation.
    ///
    /// The operation may complete its receiver before this method returns,
    /// or at any later point, on any thread. Starting an operation more
    /// than once is a logic error.
    fn start(self: Pin<&mut Self>);
}

/// Connects `sender` to `receiver`, returning the operation state.
#[inline]
pub fn connect<S, R>(sender: S, receiver: R) -> S::Operation
where
    S: Connect<R>,
{
    sender.connect(receiver)
}

/// Starts a pinned operation state.
#[inline]
pub fn start<O>(operation: Pin<&mut O>)
where
    O: OperationState + ?Sized,
{
    operation.start()
}
