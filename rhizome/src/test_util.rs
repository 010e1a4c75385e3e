use crate::{queue::Links, Linked};
use core::{pin::Pin, ptr::NonNull};
use std::boxed::Box;

#[pin_project::pin_project]
#[repr(C)]
#[derive(Debug)]
pub(crate) struct Entry {
    #[pin]
    links: Links<Entry>,
    pub(crate) val: usize,
}

unsafe impl Linked<Links<Entry>> for Entry {
    type Handle = Pin<Box<Entry>>;

    fn into_ptr(handle: Pin<Box<Entry>>) -> NonNull<Entry> {
        unsafe { NonNull::from(Box::leak(Pin::into_inner_unchecked(handle))) }
    }

    unsafe fn from_ptr(ptr: NonNull<Entry>) -> Pin<Box<Entry>> {
        Pin::new_unchecked(Box::from_raw(ptr.as_ptr()))
    }

    unsafe fn links(target: NonNull<Entry>) -> NonNull<Links<Entry>> {
        // `links` is the first field of a `repr(C)` struct.
        target.cast()
    }
}

impl Entry {
    pub(crate) fn new(val: usize) -> Pin<Box<Entry>> {
        Box::pin(Entry {
            links: Links::new(),
            val,
        })
    }
}

pub(crate) fn vals(entries: impl Iterator<Item = Pin<Box<Entry>>>) -> std::vec::Vec<usize> {
    entries.map(|entry| entry.val).collect()
}
