//! Moving a completion onto a scheduler.
//!
//! See [`via`] for details.
use crate::{
    materialize::Notification, Connect, OperationState, Query, Scheduler, SetDone, SetError,
    SetValue, Sender,
};
use core::{convert::Infallible, fmt, marker::PhantomPinned, pin::Pin, ptr::NonNull};
use pin_project::pin_project;

/// Returns a sender that completes like `sender`, but on `scheduler`.
///
/// When `sender` completes, its completion is held while the operation
/// [schedules](Scheduler::schedule) itself onto `scheduler`. Once that
/// succeeds, the held completion is delivered to the receiver from the
/// scheduler's execution context. If scheduling completes with the done
/// signal instead, the receiver is completed with the done signal and the
/// held completion is dropped.
///
/// `sender` is connected when the returned sender's operation is started,
/// rather than when it is connected.
#[must_use]
pub fn via<S, Sch>(sender: S, scheduler: Sch) -> Via<S, Sch>
where
    S: Sender,
    Sch: Scheduler,
{
    Via {
        source: sender,
        scheduler,
    }
}

/// Returned by [`via`].
#[derive(Clone, Debug)]
#[must_use = "senders do nothing unless connected and started"]
pub struct Via<S, Sch> {
    source: S,
    scheduler: Sch,
}

/// The operation state of a [`Via`] sender.
#[pin_project]
pub struct ViaOperation<S, Sch, R>
where
    S: Sender + Connect<SourceReceiver<<S as Sender>::Output, <S as Sender>::Error, Sch, R>>,
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<<S as Sender>::Output, <S as Sender>::Error, R>>,
{
    source: Option<S>,
    #[pin]
    source_op: Option<S::Operation>,
    #[pin]
    state: State<<S as Sender>::Output, <S as Sender>::Error, Sch, R>,
}

/// The receiver a [`Via`]'s source sender is connected to.
pub struct SourceReceiver<T, E, Sch, R>
where
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<T, E, R>>,
{
    state: NonNull<State<T, E, Sch, R>>,
}

/// The receiver a [`Via`]'s scheduler sender is connected to.
pub struct HopReceiver<T, E, R> {
    completion: NonNull<Completion<T, E, R>>,
}

/// The part of a [`ViaOperation`] that its receivers point into.
struct State<T, E, Sch, R>
where
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<T, E, R>>,
{
    completion: Completion<T, E, R>,
    scheduler: Sch,
    hop: Option<<Sch::Sender as Connect<HopReceiver<T, E, R>>>::Operation>,
    _pin: PhantomPinned,
}

struct Completion<T, E, R> {
    receiver: Option<R>,
    result: Option<Notification<T, E>>,
}

// === impl Via ===

impl<S, Sch> Sender for Via<S, Sch>
where
    S: Sender,
{
    type Output = S::Output;
    type Error = S::Error;
}

impl<S, Sch, R> Connect<R> for Via<S, Sch>
where
    S: Sender + Connect<SourceReceiver<<S as Sender>::Output, <S as Sender>::Error, Sch, R>>,
    Sch: Scheduler,
    Sch::Sender:
        Sender<Error = Infallible> + Connect<HopReceiver<<S as Sender>::Output, <S as Sender>::Error, R>>,
    R: SetValue<<S as Sender>::Output> + SetError<<S as Sender>::Error> + SetDone,
{
    type Operation = ViaOperation<S, Sch, R>;

    fn connect(self, receiver: R) -> Self::Operation {
        ViaOperation {
            source: Some(self.source),
            source_op: None,
            state: State {
                completion: Completion {
                    receiver: Some(receiver),
                    result: None,
                },
                scheduler: self.scheduler,
                hop: None,
                _pin: PhantomPinned,
            },
        }
    }
}

// === impl ViaOperation ===

impl<S, Sch, R> OperationState for ViaOperation<S, Sch, R>
where
    S: Sender + Connect<SourceReceiver<<S as Sender>::Output, <S as Sender>::Error, Sch, R>>,
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<<S as Sender>::Output, <S as Sender>::Error, R>>,
{
    fn start(self: Pin<&mut Self>) {
        let mut this = self.project();
        let Some(source) = this.source.take() else {
            debug_assert!(false, "via operation started twice");
            return;
        };

        // Safety: the operation is pinned, so `state` stays put until the
        // receiver has been completed.
        let state = unsafe { NonNull::from(this.state.get_unchecked_mut()) };
        this.source_op
            .set(Some(source.connect(SourceReceiver { state })));
        if let Some(source_op) = this.source_op.as_pin_mut() {
            source_op.start();
        }
    }
}

impl<S, Sch, R> fmt::Debug for ViaOperation<S, Sch, R>
where
    S: Sender + Connect<SourceReceiver<<S as Sender>::Output, <S as Sender>::Error, Sch, R>>,
    Sch: Scheduler + fmt::Debug,
    Sch::Sender: Connect<HopReceiver<<S as Sender>::Output, <S as Sender>::Error, R>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViaOperation")
            .field("scheduler", &self.state.scheduler)
            .field("started", &self.source.is_none())
            .finish_non_exhaustive()
    }
}

// === impl State ===

impl<T, E, Sch, R> State<T, E, Sch, R>
where
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<T, E, R>>,
{
    /// Holds on to `result` and schedules the hop onto the scheduler.
    ///
    /// # Safety
    ///
    /// `this` must point to the pinned state of a started operation whose
    /// source has just completed.
    unsafe fn hop(this: NonNull<Self>, result: Notification<T, E>) {
        let this = this.as_ptr();
        trace!(result = result_kind(&result), "Via::hop");
        (*this).completion.result = Some(result);

        let completion = NonNull::new_unchecked(core::ptr::addr_of_mut!((*this).completion));
        let hop = (*this)
            .scheduler
            .schedule()
            .connect(HopReceiver { completion });

        let slot = &mut (*this).hop;
        *slot = Some(hop);
        if let Some(hop) = slot.as_mut() {
            // Safety: `hop` lives inside the pinned state.
            Pin::new_unchecked(hop).start();
        }
    }
}

#[cfg(any(test, feature = "tracing", loom))]
fn result_kind<T, E>(result: &Notification<T, E>) -> &'static str {
    match result {
        Notification::Value(_) => "value",
        Notification::Error(_) => "error",
        Notification::Done => "done",
    }
}

// === impl SourceReceiver ===

impl<T, E, Sch, R> SourceReceiver<T, E, Sch, R>
where
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<T, E, R>>,
{
    fn receiver(&self) -> &R {
        // Safety: the downstream receiver is only taken once the hop has
        // completed, after the source has stopped using this receiver.
        let receiver = unsafe { (*self.state.as_ptr()).completion.receiver.as_ref() };
        match receiver {
            Some(receiver) => receiver,
            None => unsafe { unreachable_unchecked!("via source queried after completion") },
        }
    }
}

impl<T, E, Sch, R> SetValue<T> for SourceReceiver<T, E, Sch, R>
where
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<T, E, R>>,
{
    fn set_value(self, value: T) {
        unsafe { State::hop(self.state, Notification::Value(value)) }
    }
}

impl<T, E, Sch, R> SetError<E> for SourceReceiver<T, E, Sch, R>
where
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<T, E, R>>,
{
    fn set_error(self, error: E) {
        unsafe { State::hop(self.state, Notification::Error(error)) }
    }
}

impl<T, E, Sch, R> SetDone for SourceReceiver<T, E, Sch, R>
where
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<T, E, R>>,
{
    fn set_done(self) {
        unsafe { State::hop(self.state, Notification::Done) }
    }
}

impl<Q, T, E, Sch, R> Query<Q> for SourceReceiver<T, E, Sch, R>
where
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<T, E, R>>,
    R: Query<Q>,
{
    type Output = R::Output;

    #[inline]
    fn query(&self, key: Q) -> Self::Output {
        self.receiver().query(key)
    }
}

// Safety: the receiver is a pointer into an operation whose scheduler and
// completion may be used from whichever thread completes the source. That
// thread also connects the hop, whose operation is stored in the state and
// dropped with the `ViaOperation` on the thread that owns it.
unsafe impl<T, E, Sch, R> Send for SourceReceiver<T, E, Sch, R>
where
    T: Send,
    E: Send,
    Sch: Scheduler + Send,
    Sch::Sender: Connect<HopReceiver<T, E, R>>,
    <Sch::Sender as Connect<HopReceiver<T, E, R>>>::Operation: Send,
    R: Send,
{
}

impl<T, E, Sch, R> fmt::Debug for SourceReceiver<T, E, Sch, R>
where
    Sch: Scheduler,
    Sch::Sender: Connect<HopReceiver<T, E, R>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceReceiver")
            .field("state", &self.state)
            .finish()
    }
}

// === impl HopReceiver ===

impl<T, E, R> HopReceiver<T, E, R> {
    fn take(self) -> (Option<R>, Option<Notification<T, E>>) {
        // Safety: the hop is the last user of the completion, and the
        // operation outlives it.
        let completion = unsafe { &mut *self.completion.as_ptr() };
        (completion.receiver.take(), completion.result.take())
    }
}

impl<T, E, R> SetValue<()> for HopReceiver<T, E, R>
where
    R: SetValue<T> + SetError<E> + SetDone,
{
    fn set_value(self, (): ()) {
        match self.take() {
            (Some(receiver), Some(result)) => result.deliver(receiver),
            _ => unsafe { unreachable_unchecked!("via hop completed twice") },
        }
    }
}

impl<T, E, R> SetError<Infallible> for HopReceiver<T, E, R> {
    fn set_error(self, error: Infallible) {
        match error {}
    }
}

impl<T, E, R> SetDone for HopReceiver<T, E, R>
where
    R: SetDone,
{
    fn set_done(self) {
        match self.take() {
            (Some(receiver), _) => receiver.set_done(),
            _ => unsafe { unreachable_unchecked!("via hop completed twice") },
        }
    }
}

impl<Q, T, E, R> Query<Q> for HopReceiver<T, E, R>
where
    R: Query<Q>,
{
    type Output = R::Output;

    fn query(&self, key: Q) -> Self::Output {
        // Safety: the downstream receiver is only taken when the hop
        // completes.
        let receiver = unsafe { (*self.completion.as_ptr()).receiver.as_ref() };
        match receiver {
            Some(receiver) => receiver.query(key),
            None => unsafe { unreachable_unchecked!("via hop queried after completion") },
        }
    }
}

// Safety: the hop receiver moves the held completion and the downstream
// receiver to whichever thread the scheduler completes it on.
unsafe impl<T: Send, E: Send, R: Send> Send for HopReceiver<T, E, R> {}

impl<T, E, R> fmt::Debug for HopReceiver<T, E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HopReceiver")
            .field("completion", &self.completion)
            .finish()
    }
}
