// kestrel-data - Lazily realized sequences
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lazy sequences.
//!
//! A lazy seq wraps a zero-argument producer. The first call to [`LazySeq::seq`]
//! runs the producer exactly once and caches the resulting sequence (or the
//! error it failed with); every later call returns the cached result. Threads
//! that ask while realization is in progress wait for it rather than running
//! the producer again.
//!
//! A producer usually returns a cons cell whose rest is another lazy seq,
//! which is how unbounded sequences are built: each step is realized on
//! demand and never recomputed once it has been.
//!
//! A producer may also return another lazy seq directly. Realization then
//! runs the inner producer itself, in a loop, so arbitrarily deep nesting
//! costs no stack. An inner seq claimed this way is left pointing at the
//! seq that realized it.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use log::warn;

use crate::coll::Seqable;
use crate::error::{Error, Result};
use crate::seq::{Seq, drop_chain, seq};
use crate::value::Value;

type Producer = Box<dyn FnOnce() -> Result<Value> + Send>;

#[derive(Clone)]
pub struct LazySeq {
    inner: Arc<LazyInner>,
}

enum Slot {
    /// The producer hasn't run.
    Ready(Producer),
    /// Taken by this seq's own realization.
    Running,
    /// Taken by the realization of an outer seq whose producer chain
    /// returned this one. Both realize to the same sequence.
    Delegated(LazySeq),
}

/// What a realization found when it tried to take an inner seq's producer.
enum Claim {
    Run(Producer),
    Wait(Option<LazySeq>),
}

struct LazyInner {
    slot: Mutex<Slot>,
    realized: OnceLock<Result<Option<Seq>>>,
}

impl LazyInner {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand the producer to `realizer`. When it's already gone, say whose
    /// result to wait for: this seq's own, or the outer seq holding it.
    fn claim(&self, realizer: &LazySeq) -> Claim {
        let mut slot = self.lock_slot();
        match mem::replace(&mut *slot, Slot::Running) {
            Slot::Ready(produce) => {
                *slot = Slot::Delegated(realizer.clone());
                Claim::Run(produce)
            }
            Slot::Running => Claim::Wait(None),
            Slot::Delegated(outer) => {
                *slot = Slot::Delegated(outer.clone());
                Claim::Wait(Some(outer))
            }
        }
    }
}

impl Drop for LazyInner {
    fn drop(&mut self) {
        if let Some(Ok(s)) = self.realized.take() {
            drop_chain(s);
        }
    }
}

impl LazySeq {
    pub fn new(producer: impl FnOnce() -> Result<Value> + Send + 'static) -> Self {
        LazySeq {
            inner: Arc::new(LazyInner {
                slot: Mutex::new(Slot::Ready(Box::new(producer))),
                realized: OnceLock::new(),
            }),
        }
    }

    /// Whether the producer has already run.
    pub fn is_realized(&self) -> bool {
        if self.inner.realized.get().is_some() {
            return true;
        }
        let outer = match &*self.inner.lock_slot() {
            Slot::Delegated(outer) => outer.clone(),
            _ => return false,
        };
        outer.inner.realized.get().is_some()
    }

    /// Realize (once) and return the sequence, `None` if empty.
    pub fn seq(&self) -> Result<Option<Seq>> {
        self.inner.realized.get_or_init(|| self.realize()).clone()
    }

    fn realize(&self) -> Result<Option<Seq>> {
        let taken = mem::replace(&mut *self.inner.lock_slot(), Slot::Running);
        let produce = match taken {
            Slot::Ready(produce) => produce,
            Slot::Delegated(outer) => return outer.seq(),
            Slot::Running => {
                // We hold this seq's initializer, so an earlier run unwound.
                warn!("lazy seq realized after its producer panicked");
                return Err(Error::ProducerPanicked);
            }
        };
        let mut value = produce()?;
        loop {
            let next = match &value {
                Value::LazySeq(next) => next.clone(),
                other => return seq(other),
            };
            if let Some(done) = next.inner.realized.get() {
                return done.clone();
            }
            match next.inner.claim(self) {
                Claim::Run(produce) => value = produce()?,
                Claim::Wait(None) => return next.seq(),
                Claim::Wait(Some(outer)) => return outer.seq(),
            }
        }
    }

    /// Take the realized sequence out of a lazy seq nobody else holds.
    pub(crate) fn into_realized(self) -> Option<Seq> {
        let mut inner = Arc::try_unwrap(self.inner).ok()?;
        match inner.realized.take() {
            Some(Ok(s)) => s,
            Some(Err(_)) => None,
            None => {
                let slot = inner.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
                match mem::replace(slot, Slot::Running) {
                    Slot::Delegated(outer) => outer.into_realized(),
                    _ => None,
                }
            }
        }
    }

    pub fn ptr_eq(&self, other: &LazySeq) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Seqable for LazySeq {
    fn seq(&self) -> Result<Option<Seq>> {
        LazySeq::seq(self)
    }
}

impl fmt::Debug for LazySeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.realized.get() {
            None => write!(f, "#<LazySeq: pending>"),
            Some(Ok(None)) => write!(f, "()"),
            Some(Ok(Some(s))) => write!(f, "{:?}", s),
            Some(Err(e)) => write!(f, "#<LazySeq: failed: {}>", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::seq::{cons, seq_to_array};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// The naturals from `n`, one lazy step at a time.
    fn naturals(n: i64, calls: Arc<AtomicUsize>) -> Value {
        Value::LazySeq(LazySeq::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let rest = naturals(n + 1, Arc::clone(&calls));
            Ok(Value::Seq(cons(Value::Int(n), &rest)?))
        }))
    }

    fn take(x: &Value, n: usize) -> Vec<Value> {
        let mut out = Vec::new();
        let mut current = seq(x).unwrap();
        while let Some(s) = current {
            if out.len() == n {
                break;
            }
            out.push(s.first());
            current = s.next().unwrap();
        }
        out
    }

    #[test]
    fn test_producer_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let l = LazySeq::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::vector(vec![Value::Int(1)]))
        });
        assert!(!l.is_realized());
        assert!(l.seq().unwrap().is_some());
        assert!(l.seq().unwrap().is_some());
        assert!(l.is_realized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_producer_result() {
        let l = LazySeq::new(|| Ok(Value::Nil));
        assert!(l.seq().unwrap().is_none());
        let l = LazySeq::new(|| Ok(Value::list(vec![])));
        assert!(l.seq().unwrap().is_none());
    }

    #[test]
    fn test_infinite_sequence_realizes_on_demand() {
        let calls = Arc::new(AtomicUsize::new(0));
        let nats = naturals(0, Arc::clone(&calls));
        let first_five = take(&nats, 5);
        assert_eq!(first_five, (0..5).map(Value::Int).collect::<Vec<_>>());
        let after_first_pass = calls.load(Ordering::SeqCst);
        assert!(after_first_pass <= 6);

        // Walking the same prefix again doesn't re-run any producer.
        take(&nats, 5);
        assert_eq!(calls.load(Ordering::SeqCst), after_first_pass);
    }

    #[test]
    fn test_nested_lazy_seqs_flatten() {
        let inner = Value::LazySeq(LazySeq::new(|| Ok(Value::vector(vec![Value::Int(7)]))));
        let outer = LazySeq::new(move || Ok(inner));
        let s = outer.seq().unwrap().unwrap();
        assert_eq!(s.first(), Value::Int(7));
    }

    /// A lazy seq whose producer returns another lazy seq, `depth` times over.
    fn nested(depth: usize) -> Value {
        Value::LazySeq(LazySeq::new(move || {
            if depth == 0 {
                Ok(Value::vector(vec![Value::Int(1), Value::Int(2)]))
            } else {
                Ok(nested(depth - 1))
            }
        }))
    }

    #[test]
    fn test_deeply_nested_lazy_seqs_realize() {
        let v = nested(100_000);
        let s = seq(&v).unwrap().unwrap();
        assert_eq!(s.first(), Value::Int(1));
        assert_eq!(take(&v, 3), vec![Value::Int(1), Value::Int(2)]);
        drop(s);
        drop(v);
    }

    #[test]
    fn test_inner_lazy_seq_shares_outer_realization() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let inner = LazySeq::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::vector(vec![Value::Int(7)]))
        });
        let held = inner.clone();
        let outer = LazySeq::new(move || Ok(Value::LazySeq(held)));

        assert_eq!(outer.seq().unwrap().unwrap().first(), Value::Int(7));
        assert!(inner.is_realized());
        assert_eq!(inner.seq().unwrap().unwrap().first(), Value::Int(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicked_producer_fails_afterwards() {
        let l = LazySeq::new(|| {
            if true {
                panic!("producer blew up");
            }
            Ok(Value::Nil)
        });
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| l.seq()));
        assert!(outcome.is_err());
        assert!(!l.is_realized());

        assert!(matches!(l.seq(), Err(Error::ProducerPanicked)));
        // The failure is cached like any other error.
        assert!(l.is_realized());
        assert!(matches!(l.seq(), Err(Error::ProducerPanicked)));
    }

    #[test]
    fn test_panic_in_inner_producer_fails_both_seqs() {
        let inner = LazySeq::new(|| {
            if true {
                panic!("inner producer blew up");
            }
            Ok(Value::Nil)
        });
        let held = inner.clone();
        let outer = LazySeq::new(move || Ok(Value::LazySeq(held)));
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| outer.seq()));
        assert!(outcome.is_err());

        assert!(matches!(inner.seq(), Err(Error::ProducerPanicked)));
        assert!(matches!(outer.seq(), Err(Error::ProducerPanicked)));
    }

    #[test]
    fn test_error_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let l = LazySeq::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::type_error("seq", "integer"))
        });
        assert!(l.seq().is_err());
        assert!(l.seq().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seq_to_array(&Value::LazySeq(l)).is_err());
    }

    #[test]
    fn test_concurrent_realization_is_consistent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let l = LazySeq::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(10));
            Ok(Value::vector((0..3).map(Value::Int)))
        });
        let firsts: Vec<Value> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| l.seq().unwrap().unwrap().first()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(firsts.iter().all(|v| *v == Value::Int(0)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_long_realized_chain_drops_without_overflow() {
        let calls = Arc::new(AtomicUsize::new(0));
        let nats = naturals(0, calls);
        let mut current = seq(&nats).unwrap();
        for _ in 0..100_000 {
            current = current.and_then(|s| s.next().unwrap());
        }
        drop(current);
        drop(nats);
    }
}
