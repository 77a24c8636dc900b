//! Minimal synchronous future driver.
//!
//! The crate carries no async runtime dependency — `RepositoryPort` is
//! `async_trait` only to match the shape the storage layer's concrete
//! (and genuinely synchronous, `DashMap`-backed) implementation is built
//! against. Populator/Synchronizer never hand it a future that actually
//! parks, so a runtime-free poll loop is all driving it requires.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

fn noop(_: *const ()) {}
fn clone_noop(_: *const ()) -> RawWaker {
    RawWaker::new(std::ptr::null(), &VTABLE)
}
static VTABLE: RawWakerVTable = RawWakerVTable::new(clone_noop, noop, noop, noop);

/// Drives `fut` to completion on the current thread, yielding on `Pending`.
pub fn block_on<F: Future>(fut: F) -> F::Output {
    let waker = unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) };
    let mut cx = Context::from_waker(&waker);
    let mut fut: Pin<Box<F>> = Box::pin(fut);
    loop {
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(value) => return value,
            Poll::Pending => std::thread::yield_now(),
        }
    }
}
