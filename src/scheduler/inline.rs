use super::Scheduler;
use crate::{Connect, OperationState, SetValue, Sender};
use core::{convert::Infallible, fmt, pin::Pin};
use pin_project::pin_project;

/// A scheduler whose execution context is "whoever started the operation".
///
/// [`schedule`](Scheduler::schedule) returns a sender that completes
/// synchronously, inside [`start`](OperationState::start), on the calling
/// thread. This is the scheduler that [`sync_wait`](crate::sync_wait)
/// provides to the operations it drives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct InlineScheduler;

/// The sender returned by [`InlineScheduler::schedule`].
#[derive(Copy, Clone, Debug, Default)]
#[must_use = "senders do nothing unless connected and started"]
pub struct ScheduleInline {
    _p: (),
}

/// The operation state of [`ScheduleInline`].
#[pin_project]
pub struct InlineOperation<R> {
    receiver: Option<R>,
}

impl Scheduler for InlineScheduler {
    type Sender = ScheduleInline;

    #[inline]
    fn schedule(&self) -> Self::Sender {
        ScheduleInline { _p: () }
    }
}

impl Sender for ScheduleInline {
    type Output = ();
    type Error = Infallible;
}

impl<R> Connect<R> for ScheduleInline
where
    R: SetValue<()>,
{
    type Operation = InlineOperation<R>;

    fn connect(self, receiver: R) -> Self::Operation {
        InlineOperation {
            receiver: Some(receiver),
        }
    }
}

impl<R> OperationState for InlineOperation<R>
where
    R: SetValue<()>,
{
    fn start(self: Pin<&mut Self>) {
        let receiver = self.project().receiver.take();
        debug_assert!(receiver.is_some(), "operation started twice");
        if let Some(receiver) = receiver {
            receiver.set_value(());
        }
    }
}

impl<R> fmt::Debug for InlineOperation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineOperation")
            .field("started", &self.receiver.is_none())
            .finish()
    }
}
