//! Semaphore-bounded task group with first-error capture.
//!
//! [`run`] executes one task per item on worker threads, admitting at most
//! `limit` tasks at any instant. Admission happens on the dispatching
//! thread, so dispatch itself stalls once the cap is reached and resumes as
//! workers finish. Every task runs to completion regardless of sibling
//! failures; the error returned is the first one observed, later errors are
//! dropped.

use std::sync::{Condvar, Mutex};
use std::thread;

/// Counting semaphore gating task admission.
struct Semaphore {
    permits: Mutex<usize>,
    freed: Condvar,
}

impl Semaphore {
    fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            freed: Condvar::new(),
        }
    }

    fn acquire(&self) -> Permit<'_> {
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            permits = self.freed.wait(permits).unwrap();
        }
        *permits -= 1;
        Permit { sem: self }
    }
}

/// Releases its permit on drop, so a panicking task cannot starve dispatch.
struct Permit<'a> {
    sem: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        *self.sem.permits.lock().unwrap() += 1;
        self.sem.freed.notify_one();
    }
}

/// Runs `task` once per item, at most `limit` at a time, and returns the
/// first error. A `limit` of zero is treated as one.
///
/// The error slot is write-once: after the first failure it never changes,
/// but remaining items still run.
pub fn run<T, E, F>(limit: usize, items: Vec<T>, task: F) -> Result<(), E>
where
    T: Send,
    E: Send,
    F: Fn(T) -> Result<(), E> + Sync,
{
    let sem = Semaphore::new(limit.max(1));
    let first_err: Mutex<Option<E>> = Mutex::new(None);

    thread::scope(|scope| {
        for item in items {
            let permit = sem.acquire();
            let task = &task;
            let first_err = &first_err;
            scope.spawn(move || {
                let _permit = permit;
                if let Err(err) = task(item) {
                    let mut slot = first_err.lock().unwrap();
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                }
            });
        }
    });

    match first_err.into_inner().unwrap() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
