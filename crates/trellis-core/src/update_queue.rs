//! Buffered state transitions.
//!
//! Every stateful position (the root fiber, each `use_state` hook) owns an
//! [`UpdateQueue`]. Dispatching pushes an [`Update`]; the next render drains
//! the queue and folds it into the previous state with
//! [`process_update_queue`] / [`process_update_list`].
//!
//! ```rust
//! use trellis_core::update_queue::*;
//!
//! let mut queue = create_update_queue::<i32>();
//! enqueue_update(&mut queue, create_update(Action::updater(|n: &i32| n + 1)));
//! let pending = queue.take_pending();
//! assert_eq!(process_update_list(1, pending).memoized_state, 2);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

/// A literal next state or a pure `previous -> next` function.
pub enum Action<S> {
    Replace(S),
    Updater(Rc<dyn Fn(&S) -> S>),
}

impl<S> Action<S> {
    pub fn value(v: S) -> Self {
        Action::Replace(v)
    }

    pub fn updater(f: impl Fn(&S) -> S + 'static) -> Self {
        Action::Updater(Rc::new(f))
    }
}

impl<S: Clone> Clone for Action<S> {
    fn clone(&self) -> Self {
        match self {
            Action::Replace(v) => Action::Replace(v.clone()),
            Action::Updater(f) => Action::Updater(f.clone()),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Replace(v) => f.debug_tuple("Replace").field(v).finish(),
            Action::Updater(_) => f.write_str("Updater(<fn>)"),
        }
    }
}

#[derive(Debug)]
pub struct Update<S> {
    pub action: Action<S>,
}

/// How a queue treats a second update enqueued before the first is consumed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueMode {
    /// Single pending slot; a later update overwrites an unconsumed one.
    #[default]
    LastWriteWins,
    /// Updates accumulate and are folded left to right.
    Ordered,
}

#[derive(Debug)]
pub struct SharedState<S> {
    pub pending: SmallVec<[Update<S>; 1]>,
}

#[derive(Debug)]
pub struct UpdateQueue<S> {
    pub shared: SharedState<S>,
    mode: QueueMode,
}

/// Queue shared between a fiber and its alternate (or a hook and its
/// dispatch handles).
pub type SharedQueue<S> = Rc<RefCell<UpdateQueue<S>>>;

impl<S> UpdateQueue<S> {
    pub fn with_mode(mode: QueueMode) -> Self {
        Self {
            shared: SharedState {
                pending: SmallVec::new(),
            },
            mode,
        }
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    /// The update the next fold would see last, if any.
    pub fn pending(&self) -> Option<&Update<S>> {
        self.shared.pending.last()
    }

    pub fn has_pending(&self) -> bool {
        !self.shared.pending.is_empty()
    }

    /// Removes and returns everything pending, oldest first.
    pub fn take_pending(&mut self) -> SmallVec<[Update<S>; 1]> {
        std::mem::take(&mut self.shared.pending)
    }
}

impl<S> Default for UpdateQueue<S> {
    fn default() -> Self {
        Self::with_mode(QueueMode::default())
    }
}

pub fn create_update<S>(action: Action<S>) -> Update<S> {
    Update { action }
}

pub fn create_update_queue<S>() -> UpdateQueue<S> {
    UpdateQueue::default()
}

pub fn enqueue_update<S>(queue: &mut UpdateQueue<S>, update: Update<S>) {
    if queue.mode == QueueMode::LastWriteWins {
        queue.shared.pending.clear();
    }
    queue.shared.pending.push(update);
}

#[derive(Debug, PartialEq)]
pub struct ProcessedState<S> {
    pub memoized_state: S,
}

/// Folds one pending update into `base_state`. Replacement, not merge.
pub fn process_update_queue<S>(base_state: S, pending: Option<Update<S>>) -> ProcessedState<S> {
    let memoized_state = match pending {
        None => base_state,
        Some(Update {
            action: Action::Updater(f),
        }) => f(&base_state),
        Some(Update {
            action: Action::Replace(v),
        }) => v,
    };
    ProcessedState { memoized_state }
}

pub fn process_update_list<S>(
    base_state: S,
    pending: impl IntoIterator<Item = Update<S>>,
) -> ProcessedState<S> {
    pending
        .into_iter()
        .fold(ProcessedState { memoized_state: base_state }, |acc, update| {
            process_update_queue(acc.memoized_state, Some(update))
        })
}
