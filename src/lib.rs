#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg, doc_cfg_hide))]
#![cfg_attr(docsrs, doc(cfg_hide(docsrs, loom)))]
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs, missing_debug_implementations)]

pub(crate) mod loom;

#[macro_use]
pub(crate) mod util;

pub mod error;
pub mod just;
pub mod materialize;
pub mod mutex;
pub mod query;
pub mod receiver;
pub mod scheduler;
pub mod sender;
pub mod stream;
pub mod via;
pub mod with_query_value;

feature! {
    #![feature = "std"]
    pub mod sync_wait;

    #[doc(inline)]
    pub use self::sync_wait::sync_wait;
}

#[cfg(test)]
mod test_util;

#[doc(inline)]
pub use self::error::WaitError;
#[doc(inline)]
pub use self::just::{just, just_done, just_error};
#[doc(inline)]
pub use self::materialize::{dematerialize, materialize, Notification};
#[doc(inline)]
pub use self::mutex::AsyncMutex;
#[doc(inline)]
pub use self::query::{query, CustomQuery, GetScheduler, Query};
#[doc(inline)]
pub use self::receiver::{set_done, set_error, set_value, Receiver, SetDone, SetError, SetValue};
#[doc(inline)]
pub use self::scheduler::{
    get_scheduler, now, schedule, schedule_after, schedule_at, InlineScheduler, Scheduler,
    TimeScheduler,
};
#[doc(inline)]
pub use self::sender::{connect, start, Connect, OperationState, Sender};
#[doc(inline)]
pub use self::stream::{iter_stream, next_adapt_stream, via_stream, Stream};
#[doc(inline)]
pub use self::via::via;
#[doc(inline)]
pub use self::with_query_value::with_query_value;
