//! Injecting values into a receiver's environment.
//!
//! See [`with_query_value`] for details.
use crate::{
    query::{CustomQuery, GetScheduler},
    Connect, Query, SetDone, SetError, SetValue, Sender,
};
use core::{fmt, marker::PhantomData};

/// Returns a sender that runs `sender` with `key` answered by `value`.
///
/// When the returned sender is connected to a receiver, `sender` is
/// connected to a wrapper around that receiver instead. The wrapper answers
/// `key` with a clone of `value`, and forwards every completion channel, as
/// well as every other environment query, to the original receiver. The
/// injection is scoped: only `sender` (and whatever it connects to the
/// wrapper) observes `value`.
///
/// `key` may be [`GetScheduler`] or any [`CustomQuery`]. Queries for
/// [`GetScheduler`] are always forwarded when a custom key is injected, and
/// queries for any custom key are always forwarded when [`GetScheduler`] is
/// injected. Forwarding a custom key through a wrapper that injects a
/// *different* custom key must be enabled with
/// [`forward_queries!`](crate::forward_queries).
#[must_use]
pub fn with_query_value<S, K, V>(sender: S, _key: K, value: V) -> WithQueryValue<S, K, V>
where
    S: Sender,
    K: Copy,
    V: Clone,
{
    WithQueryValue {
        sender,
        value,
        _key: PhantomData,
    }
}

/// Returned by [`with_query_value`].
#[must_use = "senders do nothing unless connected and started"]
pub struct WithQueryValue<S, K, V> {
    sender: S,
    value: V,
    _key: PhantomData<fn(K)>,
}

/// The receiver wrapper that answers `K` with a `V`.
///
/// Created when a [`WithQueryValue`] is connected.
pub struct QueryValueReceiver<K, V, R> {
    receiver: R,
    value: V,
    _key: PhantomData<fn(K)>,
}

// === impl WithQueryValue ===

impl<S, K, V> Sender for WithQueryValue<S, K, V>
where
    S: Sender,
{
    type Output = S::Output;
    type Error = S::Error;
}

impl<S, K, V, R> Connect<R> for WithQueryValue<S, K, V>
where
    S: Connect<QueryValueReceiver<K, V, R>>,
{
    type Operation = S::Operation;

    fn connect(self, receiver: R) -> Self::Operation {
        self.sender.connect(QueryValueReceiver {
            receiver,
            value: self.value,
            _key: PhantomData,
        })
    }
}

impl<S: Clone, K, V: Clone> Clone for WithQueryValue<S, K, V> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            value: self.value.clone(),
            _key: PhantomData,
        }
    }
}

impl<S: fmt::Debug, K, V: fmt::Debug> fmt::Debug for WithQueryValue<S, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithQueryValue")
            .field("sender", &self.sender)
            .field("key", &core::any::type_name::<K>())
            .field("value", &self.value)
            .finish()
    }
}

// === impl QueryValueReceiver ===

impl<K, V, R> QueryValueReceiver<K, V, R> {
    /// Returns a reference to the wrapped receiver.
    pub fn get_ref(&self) -> &R {
        &self.receiver
    }

    /// Returns a reference to the injected value.
    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<K, V, R, T> SetValue<T> for QueryValueReceiver<K, V, R>
where
    R: SetValue<T>,
{
    #[inline]
    fn set_value(self, value: T) {
        self.receiver.set_value(value)
    }
}

impl<K, V, R, E> SetError<E> for QueryValueReceiver<K, V, R>
where
    R: SetError<E>,
{
    #[inline]
    fn set_error(self, error: E) {
        self.receiver.set_error(error)
    }
}

impl<K, V, R> SetDone for QueryValueReceiver<K, V, R>
where
    R: SetDone,
{
    #[inline]
    fn set_done(self) {
        self.receiver.set_done()
    }
}

// Answering the injected key.

impl<K, V, R> Query<K> for QueryValueReceiver<K, V, R>
where
    K: CustomQuery,
    V: Clone,
{
    type Output = V;

    #[inline]
    fn query(&self, _: K) -> V {
        self.value.clone()
    }
}

impl<V, R> Query<GetScheduler> for QueryValueReceiver<GetScheduler, V, R>
where
    V: Clone,
{
    type Output = V;

    #[inline]
    fn query(&self, _: GetScheduler) -> V {
        self.value.clone()
    }
}

// Forwarding every other key.

impl<K, V, R> Query<GetScheduler> for QueryValueReceiver<K, V, R>
where
    K: CustomQuery,
    R: Query<GetScheduler>,
{
    type Output = R::Output;

    #[inline]
    fn query(&self, key: GetScheduler) -> Self::Output {
        self.receiver.query(key)
    }
}

impl<Q, V, R> Query<Q> for QueryValueReceiver<GetScheduler, V, R>
where
    Q: CustomQuery,
    R: Query<Q>,
{
    type Output = R::Output;

    #[inline]
    fn query(&self, key: Q) -> Self::Output {
        self.receiver.query(key)
    }
}

impl<K, V: fmt::Debug, R: fmt::Debug> fmt::Debug for QueryValueReceiver<K, V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryValueReceiver")
            .field("key", &core::any::type_name::<K>())
            .field("value", &self.value)
            .field("receiver", &self.receiver)
            .finish()
    }
}

/// Enables forwarding between user-defined query keys.
///
/// For every ordered pair of distinct keys `(A, B)` in the list, this
/// implements [`Query<B>`](crate::Query) for a
/// [`QueryValueReceiver`] that injects `A`, by forwarding to the wrapped
/// receiver. Every key must implement [`CustomQuery`], and each pair of keys
/// may only be listed once per program.
///
/// # Examples
///
/// ```
/// use hyphae::{query::CustomQuery, forward_queries};
///
/// #[derive(Copy, Clone)]
/// struct GetDeadline;
/// impl CustomQuery for GetDeadline {}
///
/// #[derive(Copy, Clone)]
/// struct GetPriority;
/// impl CustomQuery for GetPriority {}
///
/// forward_queries!(GetDeadline, GetPriority);
/// ```
#[macro_export]
macro_rules! forward_queries {
    (@pair $injected:ty, $forwarded:ty) => {
        impl<V, R> $crate::Query<$forwarded>
            for $crate::with_query_value::QueryValueReceiver<$injected, V, R>
        where
            R: $crate::Query<$forwarded>,
        {
            type Output = <R as $crate::Query<$forwarded>>::Output;

            #[inline]
            fn query(&self, key: $forwarded) -> Self::Output {
                $crate::Query::query(self.get_ref(), key)
            }
        }
    };
    () => {};
    ($head:ty $(, $rest:ty)* $(,)?) => {
        $(
            $crate::forward_queries!(@pair $head, $rest);
            $crate::forward_queries!(@pair $rest, $head);
        )*
        $crate::forward_queries!($($rest),*);
    };
}
