//! Environment queries.
//!
//! Receivers carry an *environment*: a set of values that an operation can
//! look up by key when it is connected, such as the scheduler it should run
//! on. Keys are zero-sized types, and each one a receiver can answer is a
//! separate [`Query`] implementation, so every lookup is resolved at compile
//! time. Asking a receiver for a key it cannot answer is a compile-time
//! error.
//!
//! Combinators that wrap a receiver forward every query they do not answer
//! themselves to the receiver they wrap.
//!
//! [`GetScheduler`] is the only key defined by this crate. Other crates may
//! define their own keys by implementing [`CustomQuery`].

/// The capability to answer environment query `Q`.
pub trait Query<Q> {
    /// The type of the answer.
    type Output;

    /// Answers the query.
    fn query(&self, key: Q) -> Self::Output;
}

/// Queries the environment of `receiver` for `key`.
#[inline]
pub fn query<R, Q>(receiver: &R, key: Q) -> R::Output
where
    R: Query<Q> + ?Sized,
{
    receiver.query(key)
}

/// Queries a receiver for the scheduler its operation should run on.
///
/// See [`get_scheduler`](crate::get_scheduler).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GetScheduler;

/// Marker for user-defined query keys.
///
/// Implementing this trait for a key lets
/// [`with_query_value`](crate::with_query_value) inject it, and lets the
/// wrapper it creates forward it when a different key is injected. To
/// forward between two user-defined keys, use
/// [`forward_queries!`](crate::forward_queries).
pub trait CustomQuery: Copy {}

impl<Q, R> Query<Q> for &R
where
    R: Query<Q> + ?Sized,
{
    type Output = R::Output;

    #[inline]
    fn query(&self, key: Q) -> Self::Output {
        (**self).query(key)
    }
}
