//! Streams of senders.
//!
//! A [`Stream`] is a repeatable source of senders: every call to
//! [`next`](Stream::next) returns a sender for the next element, and
//! [`cleanup`](Stream::cleanup) returns a sender that releases whatever the
//! stream holds. Streams are adapted by transforming the sender returned by
//! `next`, which leaves the stream's own type and its cleanup untouched.
use crate::{
    just::{just, Just, Ready},
    via::{via, Via},
    Connect, OperationState, Scheduler, SetDone, SetValue, Sender,
};
use core::{convert::Infallible, fmt, pin::Pin};

/// A repeatable sequence of asynchronous elements.
///
/// The sender returned by [`next`](Self::next) completes with the next
/// element on its value channel, or with the done signal once the sequence
/// has ended. Once the caller is finished with the stream, it must run the
/// sender returned by [`cleanup`](Self::cleanup) to completion.
pub trait Stream {
    /// The sender returned by [`next`](Self::next).
    type Next: Sender;

    /// The sender returned by [`cleanup`](Self::cleanup).
    type Cleanup: Sender<Output = ()>;

    /// Returns a sender for the next element.
    fn next(&mut self) -> Self::Next;

    /// Returns a sender that releases the stream's resources.
    fn cleanup(&mut self) -> Self::Cleanup;
}

/// Returns a stream whose [`next`](Stream::next) senders are `f` applied to
/// those of `stream`.
///
/// `f` is called on every call to `next`, in order. [`cleanup`] is passed
/// through to `stream` unmodified.
///
/// [`cleanup`]: Stream::cleanup
#[must_use]
pub fn next_adapt_stream<St, F, S>(stream: St, f: F) -> NextAdapt<St, F>
where
    St: Stream,
    F: FnMut(St::Next) -> S,
    S: Sender,
{
    NextAdapt { stream, f }
}

/// Returns a stream whose elements are delivered on `scheduler`.
///
/// Every sender returned by [`next`](Stream::next) is wrapped with
/// [`via`], so each element (and the end of the sequence) is delivered from
/// `scheduler`'s execution context. [`cleanup`](Stream::cleanup) is not
/// moved.
#[must_use]
pub fn via_stream<Sch, St>(
    scheduler: Sch,
    stream: St,
) -> NextAdapt<St, impl FnMut(St::Next) -> Via<St::Next, Sch>>
where
    Sch: Scheduler,
    St: Stream,
{
    next_adapt_stream(stream, move |next| via(next, scheduler.clone()))
}

/// Returns a stream that yields the items of `iter`.
///
/// Each call to [`next`](Stream::next) pulls one item from `iter` and
/// returns a sender that completes with it, or with the done signal once
/// `iter` is exhausted. Cleanup drops the iterator.
#[must_use]
pub fn iter_stream<I>(iter: I) -> IterStream<I::IntoIter>
where
    I: IntoIterator,
{
    IterStream {
        iter: Some(iter.into_iter()),
    }
}

/// Returned by [`next_adapt_stream`].
#[derive(Clone)]
pub struct NextAdapt<St, F> {
    stream: St,
    f: F,
}

/// Returned by [`iter_stream`].
#[derive(Clone, Debug)]
pub struct IterStream<I> {
    iter: Option<I>,
}

/// The sender returned by [`IterStream::next`](Stream::next).
#[must_use = "senders do nothing unless connected and started"]
pub struct NextItem<T> {
    item: Option<T>,
}

// === impl NextAdapt ===

impl<St, F> NextAdapt<St, F> {
    /// Returns a reference to the adapted stream.
    pub fn get_ref(&self) -> &St {
        &self.stream
    }

    /// Consumes the adapter, returning the adapted stream.
    pub fn into_inner(self) -> St {
        self.stream
    }
}

impl<St, F, S> Stream for NextAdapt<St, F>
where
    St: Stream,
    F: FnMut(St::Next) -> S,
    S: Sender,
{
    type Next = S;
    type Cleanup = St::Cleanup;

    fn next(&mut self) -> S {
        (self.f)(self.stream.next())
    }

    fn cleanup(&mut self) -> St::Cleanup {
        self.stream.cleanup()
    }
}

impl<St: fmt::Debug, F> fmt::Debug for NextAdapt<St, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NextAdapt")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

// === impl IterStream ===

impl<I> Stream for IterStream<I>
where
    I: Iterator,
{
    type Next = NextItem<I::Item>;
    type Cleanup = Just<()>;

    fn next(&mut self) -> Self::Next {
        // fused by hand, so a `next` after the end is done again.
        let item = self.iter.as_mut().and_then(Iterator::next);
        if item.is_none() {
            self.iter = None;
        }
        NextItem { item }
    }

    fn cleanup(&mut self) -> Self::Cleanup {
        self.iter = None;
        just(())
    }
}

// === impl NextItem ===

impl<T> Sender for NextItem<T> {
    type Output = T;
    type Error = Infallible;
}

impl<T, R> Connect<R> for NextItem<T>
where
    R: SetValue<T> + SetDone,
{
    type Operation = Ready<Item<T>, R>;

    fn connect(self, receiver: R) -> Self::Operation {
        Ready::new(Item(self.item), receiver)
    }
}

impl<T: fmt::Debug> fmt::Debug for NextItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NextItem").field("item", &self.item).finish()
    }
}

#[doc(hidden)]
#[derive(Debug)]
pub struct Item<T>(Option<T>);

impl<T, R> OperationState for Ready<Item<T>, R>
where
    R: SetValue<T> + SetDone,
{
    fn start(self: Pin<&mut Self>) {
        match self.take() {
            Some((Item(Some(item)), receiver)) => receiver.set_value(item),
            Some((Item(None), receiver)) => receiver.set_done(),
            None => {}
        }
    }
}
