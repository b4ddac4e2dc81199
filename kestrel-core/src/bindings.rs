// kestrel-core - Dynamic binding frame management
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Thread-local binding frames for dynamic vars.
//!
//! Each thread has its own stack of binding frames, stored with
//! `thread_local!` and a `RefCell`. A frame is immutable once pushed and
//! carries the cumulative map of every binding visible at that depth, so a
//! lookup is a single map access rather than a walk up the stack.
//!
//! Bindings are keyed by [`Var::id`] and stored in shared cells. `set!`
//! writes the cell in place, which is what lets a frame handed to another
//! thread with [`BindingFrame::capture`] see the same bindings as the thread
//! that captured it.
//!
//! A thread is the unit of isolation. Pushes on one thread are never
//! visible to another unless a frame is conveyed explicitly.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use log::error;

use kestrel_data::{Error, Result, Value, Var};

type VarId = u64;

/// A shared, mutable binding slot.
type BindingCell = Arc<RwLock<Value>>;

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

struct Frame {
    id: u64,
    /// Vars bound by this frame itself, as opposed to inherited ones.
    pushed: Vec<Var>,
    /// Every binding visible at this depth.
    bindings: im::HashMap<VarId, BindingCell>,
    prev: Option<Arc<Frame>>,
    depth: usize,
    /// Owned by a [`BindingGuard`]; only the guard may pop it.
    guarded: bool,
}

impl Frame {
    fn push(prev: Option<Arc<Frame>>, pairs: Vec<(Var, Value)>, guarded: bool) -> Arc<Frame> {
        let mut bindings = prev
            .as_ref()
            .map(|p| p.bindings.clone())
            .unwrap_or_default();
        let mut pushed = Vec::with_capacity(pairs.len());
        for (var, value) in pairs {
            bindings.insert(var.id(), Arc::new(RwLock::new(value)));
            pushed.push(var);
        }
        let depth = prev.as_ref().map_or(0, |p| p.depth) + 1;
        Arc::new(Frame {
            id: NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed),
            pushed,
            bindings,
            prev,
            depth,
            guarded,
        })
    }

    fn contains_id(frame: &Option<Arc<Frame>>, id: u64) -> bool {
        let mut current = frame.as_ref();
        while let Some(f) = current {
            if f.id == id {
                return true;
            }
            current = f.prev.as_ref();
        }
        false
    }
}

thread_local! {
    /// The current binding frame. None means no dynamic bindings are active.
    static CURRENT_FRAME: RefCell<Option<Arc<Frame>>> = const { RefCell::new(None) };
}

fn current_frame() -> Option<Arc<Frame>> {
    CURRENT_FRAME.with(|cell| cell.borrow().clone())
}

fn replace_frame(frame: Option<Arc<Frame>>) -> Option<Arc<Frame>> {
    CURRENT_FRAME.with(|cell| cell.replace(frame))
}

fn binding_cell(var: &Var) -> Option<BindingCell> {
    if !var.is_dynamic() {
        return None;
    }
    CURRENT_FRAME.with(|cell| {
        cell.borrow()
            .as_ref()
            .and_then(|f| f.bindings.get(&var.id()).cloned())
    })
}

fn check_dynamic(var: &Var) -> Result<()> {
    if var.is_dynamic() {
        Ok(())
    } else {
        Err(Error::NotDynamic(var.qualified_name()))
    }
}

// ============================================================================
// Push and pop
// ============================================================================

/// Push a frame binding `var` to `value` on this thread.
///
/// Must be matched by [`pop_binding`] for the same var. Prefer
/// [`push_bindings`], whose guard pops on every exit path.
pub fn push_binding(var: &Var, value: Value) -> Result<()> {
    check_dynamic(var)?;
    let prev = current_frame();
    replace_frame(Some(Frame::push(prev, vec![(var.clone(), value)], false)));
    Ok(())
}

/// Pop the frame pushed by the matching [`push_binding`].
///
/// Fails with [`Error::UnbalancedBinding`] if nothing is pushed on this
/// thread, if the innermost frame doesn't bind exactly `var`, or if that
/// frame belongs to a [`BindingGuard`].
pub fn pop_binding(var: &Var) -> Result<()> {
    let Some(top) = current_frame() else {
        return Err(Error::UnbalancedBinding(format!(
            "pop of {} with no binding pushed",
            var.qualified_name()
        )));
    };
    if top.guarded {
        return Err(Error::UnbalancedBinding(format!(
            "pop of {} would release a frame owned by a binding guard",
            var.qualified_name()
        )));
    }
    match top.pushed.as_slice() {
        [only] if only.ptr_eq(var) => {
            replace_frame(top.prev.clone());
            Ok(())
        }
        _ => Err(Error::UnbalancedBinding(format!(
            "pop of {} out of order, innermost frame binds {}",
            var.qualified_name(),
            describe(&top.pushed)
        ))),
    }
}

fn describe(vars: &[Var]) -> String {
    let names: Vec<String> = vars.iter().map(Var::qualified_name).collect();
    names.join(", ")
}

/// Push one frame binding every pair. The frame is popped when the
/// returned guard drops.
///
/// Every var must be dynamic; otherwise nothing is pushed and the first
/// offender is reported as [`Error::NotDynamic`]. A var listed twice takes
/// its last value.
pub fn push_bindings(pairs: impl IntoIterator<Item = (Var, Value)>) -> Result<BindingGuard> {
    let pairs: Vec<(Var, Value)> = pairs.into_iter().collect();
    for (var, _) in &pairs {
        check_dynamic(var)?;
    }
    let frame = Frame::push(current_frame(), pairs, true);
    let id = frame.id;
    replace_frame(Some(frame));
    Ok(BindingGuard {
        frame_id: id,
        _not_send: PhantomData,
    })
}

/// RAII guard that pops its binding frame when dropped.
///
/// Frames left above it by unmatched pushes are unwound too, so the
/// thread ends up exactly where it was before the guard was created. The
/// guard is tied to the thread that created it.
#[must_use = "bindings are popped as soon as the guard is dropped"]
pub struct BindingGuard {
    frame_id: u64,
    _not_send: PhantomData<*const ()>,
}

impl Drop for BindingGuard {
    fn drop(&mut self) {
        CURRENT_FRAME.with(|cell| {
            let mut current = cell.borrow_mut();
            if !Frame::contains_id(&current, self.frame_id) {
                error!(
                    "binding frame {} is not on this thread's stack, leaving bindings alone",
                    self.frame_id
                );
                return;
            }
            while let Some(top) = current.take() {
                if top.id == self.frame_id {
                    *current = top.prev.clone();
                    break;
                }
                error!(
                    "unwinding unbalanced binding frame {} for {}",
                    top.id,
                    describe(&top.pushed)
                );
                *current = top.prev.clone();
            }
        });
    }
}

/// Run `f` with `var` bound to `value`, popping the binding afterwards even
/// if `f` panics.
pub fn with_binding<F, R>(var: &Var, value: Value, f: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    let _guard = push_bindings([(var.clone(), value)])?;
    Ok(f())
}

// ============================================================================
// Reading and writing bindings
// ============================================================================

/// Get the thread-local binding for a var, if any.
/// Returns None if the var has no thread-local binding.
#[inline]
#[must_use]
pub fn get_thread_binding(var: &Var) -> Option<Value> {
    binding_cell(var).map(|cell| cell.read().unwrap_or_else(PoisonError::into_inner).clone())
}

/// Check if a var has a thread-local binding.
#[inline]
pub fn has_thread_binding(var: &Var) -> bool {
    binding_cell(var).is_some()
}

/// The value `var` has on this thread: the innermost binding, else the
/// root. Fails with [`Error::UnboundVar`] when there is neither.
pub fn current_value(var: &Var) -> Result<Value> {
    match get_thread_binding(var) {
        Some(value) => Ok(value),
        None => var.deref_root(),
    }
}

/// True if `var` has a thread binding here or a root value.
pub fn is_bound(var: &Var) -> bool {
    has_thread_binding(var) || var.has_root()
}

/// Replace the innermost thread binding of `var` (`set!`).
///
/// Fails with [`Error::NoThreadBinding`] when there is no binding to
/// replace; roots are never changed this way.
pub fn set_binding(var: &Var, value: Value) -> Result<()> {
    let cell = binding_cell(var).ok_or_else(|| Error::NoThreadBinding(var.qualified_name()))?;
    *cell.write().unwrap_or_else(PoisonError::into_inner) = value;
    Ok(())
}

/// Number of frames on this thread's stack.
pub fn frame_depth() -> usize {
    CURRENT_FRAME.with(|cell| cell.borrow().as_ref().map_or(0, |f| f.depth))
}

// ============================================================================
// Conveyance
// ============================================================================

/// A snapshot of a thread's bindings that can be installed on another
/// thread or in another task.
#[derive(Clone, Default)]
pub struct BindingFrame {
    frame: Option<Arc<Frame>>,
}

impl BindingFrame {
    /// The current thread's bindings.
    pub fn capture() -> Self {
        BindingFrame {
            frame: current_frame(),
        }
    }

    /// A frame with no bindings.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }

    /// Install this snapshot as the current thread's bindings until the
    /// returned guard drops, which restores whatever was there before.
    pub fn enter(&self) -> FrameGuard {
        let saved = replace_frame(self.frame.clone());
        FrameGuard {
            saved,
            _not_send: PhantomData,
        }
    }
}

impl std::fmt::Debug for BindingFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let depth = self.frame.as_ref().map_or(0, |f| f.depth);
        f.debug_struct("BindingFrame").field("depth", &depth).finish()
    }
}

/// Restores the bindings replaced by [`BindingFrame::enter`].
#[must_use = "the previous bindings are restored as soon as the guard is dropped"]
pub struct FrameGuard {
    saved: Option<Arc<Frame>>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        replace_frame(self.saved.take());
    }
}

/// Wrap `f` so that it runs with the bindings current at the time of
/// wrapping, whichever thread ends up calling it.
pub fn bound_fn<F, R>(f: F) -> impl FnOnce() -> R + Send + 'static
where
    F: FnOnce() -> R + Send + 'static,
    R: 'static,
{
    let frame = BindingFrame::capture();
    move || {
        let _guard = frame.enter();
        f()
    }
}
