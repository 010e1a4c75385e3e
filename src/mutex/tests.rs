use super::*;
use crate::{connect, start, util::test::assert_send_sync};

#[test]
fn mutex_is_send_and_sync() {
    assert_send_sync::<AsyncMutex>();
}

#[test]
fn lock_operation_is_send() {
    crate::util::test::assert_send::<LockOperation<'_, crate::test_util::Recorder<(), Infallible>>>();
}

#[cfg(not(loom))]
mod single_threaded {
    use super::*;
    use crate::{materialize::Notification, test_util::Recorder, util::trace_init};
    use core::pin::pin;
    use std::{
        boxed::Box,
        collections::VecDeque,
        sync::{Arc, Mutex},
        vec,
        vec::Vec,
    };

    /// Records the order in which operations acquire the lock.
    #[derive(Clone, Default)]
    struct Order(Arc<Mutex<Vec<usize>>>);

    impl Order {
        fn get(&self) -> Vec<usize> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Acquired {
        id: usize,
        order: Order,
    }

    impl SetValue<()> for Acquired {
        fn set_value(self, (): ()) {
            self.order.0.lock().unwrap().push(self.id);
        }
    }

    /// Releases the lock as soon as it is acquired.
    struct AcquireAndRelease<'a> {
        id: usize,
        order: Order,
        mutex: &'a AsyncMutex,
    }

    impl SetValue<()> for AcquireAndRelease<'_> {
        fn set_value(self, (): ()) {
            self.order.0.lock().unwrap().push(self.id);
            unsafe { self.mutex.unlock() }
        }
    }

    #[test]
    fn try_lock() {
        let _trace = trace_init();
        let mutex = AsyncMutex::new();
        assert!(!mutex.is_locked());

        assert!(mutex.try_lock());
        assert!(mutex.is_locked());
        // a second attempt fails, and leaves the mutex locked.
        assert!(!mutex.try_lock());
        assert!(mutex.is_locked());

        unsafe { mutex.unlock() };
        assert!(!mutex.is_locked());
        assert!(mutex.try_lock());
        unsafe { mutex.unlock() };
    }

    #[test]
    fn uncontended_lock_completes_inside_start() {
        let _trace = trace_init();
        let mutex = AsyncMutex::new();
        let (recorder, log) = Recorder::<(), Infallible>::new();

        let mut op = pin!(connect(mutex.async_lock(), recorder));
        assert!(!mutex.is_locked(), "connect must not start the operation");
        assert!(log.is_empty());

        start(op.as_mut());
        assert_eq!(log.single(), Notification::Value(()));
        assert!(mutex.is_locked());
        // the lock is held, so `try_lock` fails.
        assert!(!mutex.try_lock());

        unsafe { mutex.unlock() };
        assert!(!mutex.is_locked());
    }

    #[test]
    fn waiters_are_resumed_in_fifo_order() {
        let _trace = trace_init();
        let mutex = AsyncMutex::new();
        let order = Order::default();
        assert!(mutex.try_lock());

        let mut op1 = pin!(connect(mutex.async_lock(), Acquired { id: 1, order: order.clone() }));
        let mut op2 = pin!(connect(mutex.async_lock(), Acquired { id: 2, order: order.clone() }));
        let mut op3 = pin!(connect(mutex.async_lock(), Acquired { id: 3, order: order.clone() }));
        start(op1.as_mut());
        start(op2.as_mut());
        start(op3.as_mut());
        assert_eq!(order.get(), Vec::<usize>::new(), "nobody may acquire a held lock");

        unsafe { mutex.unlock() };
        assert_eq!(order.get(), vec![1]);
        assert!(mutex.is_locked());

        unsafe { mutex.unlock() };
        assert_eq!(order.get(), vec![1, 2]);

        unsafe { mutex.unlock() };
        assert_eq!(order.get(), vec![1, 2, 3]);
        assert!(mutex.is_locked());

        unsafe { mutex.unlock() };
        assert!(!mutex.is_locked());
    }

    #[test]
    fn late_waiters_queue_behind_pending_ones() {
        let _trace = trace_init();
        let mutex = AsyncMutex::new();
        let order = Order::default();
        assert!(mutex.try_lock());

        let mut op1 = pin!(connect(mutex.async_lock(), Acquired { id: 1, order: order.clone() }));
        let mut op2 = pin!(connect(mutex.async_lock(), Acquired { id: 2, order: order.clone() }));
        start(op1.as_mut());
        start(op2.as_mut());

        // detaches [1, 2] and hands off to 1; 2 is left in the holder's buffer.
        unsafe { mutex.unlock() };
        assert_eq!(order.get(), vec![1]);

        // 3 arrives in the atomic queue while 2 is still buffered.
        let mut op3 = pin!(connect(mutex.async_lock(), Acquired { id: 3, order: order.clone() }));
        start(op3.as_mut());

        unsafe { mutex.unlock() };
        assert_eq!(order.get(), vec![1, 2]);
        unsafe { mutex.unlock() };
        assert_eq!(order.get(), vec![1, 2, 3]);
        unsafe { mutex.unlock() };
        assert!(!mutex.is_locked());
    }

    #[test]
    fn receivers_may_unlock_during_completion() {
        let _trace = trace_init();
        let mutex = AsyncMutex::new();
        let order = Order::default();
        assert!(mutex.try_lock());

        let mut ops: Vec<_> = (1..=4)
            .map(|id| {
                Box::pin(connect(
                    mutex.async_lock(),
                    AcquireAndRelease {
                        id,
                        order: order.clone(),
                        mutex: &mutex,
                    },
                ))
            })
            .collect();
        for op in &mut ops {
            start(op.as_mut());
        }
        assert!(order.get().is_empty());

        // each waiter releases the lock from inside its completion, handing
        // it straight to the next one.
        unsafe { mutex.unlock() };
        assert_eq!(order.get(), vec![1, 2, 3, 4]);
        assert!(!mutex.is_locked());
    }

    #[test]
    fn lock_after_release_is_synchronous_again() {
        let _trace = trace_init();
        let mutex = AsyncMutex::new();
        let order = Order::default();

        let mut op1 = pin!(connect(
            mutex.async_lock(),
            AcquireAndRelease {
                id: 1,
                order: order.clone(),
                mutex: &mutex
            }
        ));
        start(op1.as_mut());
        assert_eq!(order.get(), vec![1]);
        assert!(!mutex.is_locked());

        let mut op2 = pin!(connect(mutex.async_lock(), Acquired { id: 2, order: order.clone() }));
        start(op2.as_mut());
        assert_eq!(order.get(), vec![1, 2]);
        unsafe { mutex.unlock() };
    }

    proptest::proptest! {
        /// Arbitrary interleavings of arriving waiters and unlocks hand the
        /// lock out in arrival order.
        #[test]
        fn hand_off_order_matches_arrival_order(arrivals in proptest::collection::vec(proptest::bool::ANY, 0..48)) {
            let mutex = AsyncMutex::new();
            let order = Order::default();
            let mut ops = Vec::new();

            let mut locked = false;
            let mut waiting = VecDeque::new();
            let mut expected = Vec::new();

            for (id, arrives) in arrivals.into_iter().enumerate() {
                if arrives {
                    let mut op = Box::pin(connect(
                        mutex.async_lock(),
                        Acquired { id, order: order.clone() },
                    ));
                    start(op.as_mut());
                    ops.push(op);
                    if locked {
                        waiting.push_back(id);
                    } else {
                        locked = true;
                        expected.push(id);
                    }
                } else if locked {
                    unsafe { mutex.unlock() };
                    match waiting.pop_front() {
                        Some(next) => expected.push(next),
                        None => locked = false,
                    }
                }
            }

            // release everything before the operations are dropped.
            while locked {
                unsafe { mutex.unlock() };
                match waiting.pop_front() {
                    Some(next) => expected.push(next),
                    None => locked = false,
                }
            }

            proptest::prop_assert!(!mutex.is_locked());
            proptest::prop_assert_eq!(order.get(), expected);
        }
    }
}

mod concurrent {
    use super::*;
    use crate::loom::{
        self,
        cell::UnsafeCell,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
    };
    use core::pin::pin;

    struct Shared {
        mutex: AsyncMutex,
        count: UnsafeCell<usize>,
    }

    // Safety: `count` is only accessed while holding `mutex`.
    unsafe impl Sync for Shared {}

    /// Increments the shared count inside the critical section, then
    /// releases the lock.
    struct Increment {
        shared: Arc<Shared>,
        done: Arc<AtomicBool>,
    }

    impl SetValue<()> for Increment {
        fn set_value(self, (): ()) {
            self.shared.count.with_mut(|count| unsafe { *count += 1 });
            unsafe { self.shared.mutex.unlock() };
            self.done.store(true, Ordering::Release);
        }
    }

    fn lock_and_increment(shared: &Arc<Shared>) {
        let done = Arc::new(AtomicBool::new(false));
        let receiver = Increment {
            shared: shared.clone(),
            done: done.clone(),
        };
        let mut op = pin!(connect(shared.mutex.async_lock(), receiver));
        start(op.as_mut());
        // the operation must stay alive until it has been completed, possibly
        // by the other thread.
        while !done.load(Ordering::Acquire) {
            thread::yield_now();
        }
    }

    #[test]
    fn exclusion() {
        loom::model(|| {
            let shared = Arc::new(Shared {
                mutex: AsyncMutex::new(),
                count: UnsafeCell::new(0),
            });

            let thread = thread::spawn({
                let shared = shared.clone();
                move || lock_and_increment(&shared)
            });
            lock_and_increment(&shared);
            thread.join().unwrap();

            let count = shared.count.with(|count| unsafe { *count });
            assert_eq!(count, 2);
            assert!(!shared.mutex.is_locked());
        })
    }

    #[test]
    fn try_lock_races_async_lock() {
        loom::model(|| {
            let shared = Arc::new(Shared {
                mutex: AsyncMutex::new(),
                count: UnsafeCell::new(0),
            });

            let thread = thread::spawn({
                let shared = shared.clone();
                move || {
                    if shared.mutex.try_lock() {
                        shared.count.with_mut(|count| unsafe { *count += 1 });
                        unsafe { shared.mutex.unlock() };
                    }
                }
            });
            lock_and_increment(&shared);
            thread.join().unwrap();

            let count = shared.count.with(|count| unsafe { *count });
            assert!(count == 1 || count == 2, "count = {count}");
            assert!(!shared.mutex.is_locked());
        })
    }
}
