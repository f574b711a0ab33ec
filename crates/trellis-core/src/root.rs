//! Roots: the owner of one fiber tree, its host and its mount container.
//!
//! ```rust
//! use trellis_core::*;
//!
//! let container = MemNode::container();
//! let root = create_container(MemoryHost::new(), container.clone());
//!
//! assert!(root.render(h("ul").with_children(vec![h("li").child("a").into()])).is_committed());
//! assert_eq!(container.to_markup(), "<ul><li>a</li></ul>");
//!
//! root.render(Node::Empty);
//! assert_eq!(container.to_markup(), "");
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::element::{Node, Props};
use crate::error::WorkLoopError;
use crate::fiber::{FiberArena, FiberId, FiberNode, MemoizedState, WorkTag};
use crate::hooks::ScheduleUpdate;
use crate::host::HostConfig;
use crate::update_queue::{Action, QueueMode, UpdateQueue, create_update, enqueue_update};
use crate::work_loop::{CommitStats, RenderOutcome};

pub(crate) type DeferredQueue = Rc<RefCell<VecDeque<FiberId>>>;

#[derive(Clone, Debug)]
pub struct RootOptions {
    /// Queue discipline of the root and of every state hook under it.
    pub queue_mode: QueueMode,
    /// Maximum number of deferred cycles one drain may run.
    pub nested_update_limit: usize,
    /// Extra debug-only checks, such as warning on dispatches to unmounted
    /// fibers.
    pub dev_diagnostics: bool,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            queue_mode: QueueMode::default(),
            nested_update_limit: 50,
            dev_diagnostics: cfg!(debug_assertions),
        }
    }
}

impl RootOptions {
    pub fn with_queue_mode(mut self, mode: QueueMode) -> Self {
        self.queue_mode = mode;
        self
    }

    pub fn with_nested_update_limit(mut self, limit: usize) -> Self {
        self.nested_update_limit = limit;
        self
    }

    pub fn with_dev_diagnostics(mut self, enabled: bool) -> Self {
        self.dev_diagnostics = enabled;
        self
    }
}

/// State of one root: the double-buffered tree and the work loop pointers.
///
/// Only the work loop writes `current`, `finished_work` and
/// `work_in_progress`; everything public here is read access.
pub struct FiberRootNode<H: HostConfig> {
    pub(crate) container: H::Container,
    pub(crate) host: H,
    pub(crate) fibers: FiberArena<H::Instance>,
    pub(crate) current: FiberId,
    pub(crate) finished_work: Option<FiberId>,
    pub(crate) work_in_progress: Option<FiberId>,
    pub(crate) options: RootOptions,
    pub(crate) scheduler: Rc<dyn ScheduleUpdate>,
    pub(crate) deferred: DeferredQueue,
    pub(crate) units_of_work: usize,
    pub(crate) commit_count: u64,
    pub(crate) last_stats: Option<CommitStats>,
}

impl<H: HostConfig> fmt::Debug for FiberRootNode<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberRootNode")
            .field("container", &self.container)
            .field("current", &self.current)
            .field("work_in_progress", &self.work_in_progress)
            .field("fibers", &self.fibers.len())
            .field("commit_count", &self.commit_count)
            .finish_non_exhaustive()
    }
}

impl<H: HostConfig> FiberRootNode<H> {
    pub(crate) fn new(
        host: H,
        container: H::Container,
        options: RootOptions,
        scheduler: Rc<dyn ScheduleUpdate>,
        deferred: DeferredQueue,
    ) -> Self {
        let mut fibers = FiberArena::new();
        let mut root_fiber = FiberNode::new(WorkTag::HostRoot, Rc::new(Props::default()), None);
        root_fiber.update_queue = Some(Rc::new(RefCell::new(UpdateQueue::with_mode(
            options.queue_mode,
        ))));
        root_fiber.memoized_state = MemoizedState::Root(Node::Empty);
        let current = fibers.alloc_persistent(root_fiber);

        Self {
            container,
            host,
            fibers,
            current,
            finished_work: None,
            work_in_progress: None,
            options,
            scheduler,
            deferred,
            units_of_work: 0,
            commit_count: 0,
            last_stats: None,
        }
    }

    /// The host root fiber of the committed tree.
    pub fn current(&self) -> FiberId {
        self.current
    }

    pub fn fiber(&self, id: FiberId) -> Option<&FiberNode<H::Instance>> {
        self.fibers.get(id)
    }

    pub fn fibers(&self) -> &FiberArena<H::Instance> {
        &self.fibers
    }

    pub fn fiber_count(&self) -> usize {
        self.fibers.len()
    }

    pub fn finished_work(&self) -> Option<FiberId> {
        self.finished_work
    }

    pub fn work_in_progress(&self) -> Option<FiberId> {
        self.work_in_progress
    }

    pub fn is_rendering(&self) -> bool {
        self.work_in_progress.is_some()
    }

    /// The node last committed through the root's update queue.
    pub fn root_state(&self) -> Option<&Node> {
        self.fibers.get(self.current)?.memoized_state.root_node()
    }

    pub fn container(&self) -> &H::Container {
        &self.container
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn options(&self) -> &RootOptions {
        &self.options
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    pub fn last_commit_stats(&self) -> Option<&CommitStats> {
        self.last_stats.as_ref()
    }

    /// Runs deferred cycles until the queue is empty or the nested update
    /// limit is hit. Returns `first` unless a later cycle aborted.
    pub(crate) fn drain_deferred(&mut self, first: Option<RenderOutcome>) -> Option<RenderOutcome> {
        let limit = self.options.nested_update_limit;
        let mut outcome = first;
        let mut nested = 0;
        loop {
            let next = self.deferred.borrow_mut().pop_front();
            let Some(fiber) = next else {
                break;
            };
            nested += 1;
            if nested > limit {
                let dropped = {
                    let mut deferred = self.deferred.borrow_mut();
                    let n = deferred.len() + 1;
                    deferred.clear();
                    n
                };
                log::error!(
                    "maximum update depth exceeded: {limit} nested updates, dropping {dropped} more"
                );
                return Some(RenderOutcome::Aborted(WorkLoopError::NestedUpdateLimit {
                    limit,
                }));
            }
            log::debug!("running deferred update on {fiber:?} ({nested}/{limit})");
            let next_outcome = self.schedule_update_on_fiber(fiber);
            outcome = match outcome {
                None => Some(next_outcome),
                Some(_) if next_outcome.is_aborted() => Some(next_outcome),
                Some(previous) => Some(previous),
            };
        }
        outcome
    }
}

/// Scheduling handle given to hooks. Holds the root weakly; an update that
/// arrives while the root is borrowed is queued and run by whoever holds it.
struct RootScheduler<H: HostConfig> {
    root: Weak<RefCell<FiberRootNode<H>>>,
    deferred: DeferredQueue,
}

impl<H: HostConfig> ScheduleUpdate for RootScheduler<H> {
    fn schedule_update_on_fiber(&self, fiber: FiberId) -> RenderOutcome {
        let Some(cell) = self.root.upgrade() else {
            log::debug!("update on {fiber:?} after its root was dropped");
            return RenderOutcome::Unreachable;
        };
        let Ok(mut root) = cell.try_borrow_mut() else {
            let mut deferred = self.deferred.borrow_mut();
            if !deferred.contains(&fiber) {
                deferred.push_back(fiber);
            }
            log::debug!("root busy, deferring update on {fiber:?}");
            return RenderOutcome::Deferred;
        };
        let outcome = root.schedule_update_on_fiber(fiber);
        root.drain_deferred(Some(outcome))
            .unwrap_or(RenderOutcome::Unreachable)
    }
}

/// Handle to a mounted root.
pub struct Root<H: HostConfig> {
    inner: Rc<RefCell<FiberRootNode<H>>>,
    deferred: DeferredQueue,
    scheduler: Rc<dyn ScheduleUpdate>,
}

impl<H: HostConfig> Clone for Root<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            deferred: self.deferred.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<H: HostConfig> fmt::Debug for Root<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(root) => fmt::Debug::fmt(&*root, f),
            Err(_) => f.write_str("Root(<busy>)"),
        }
    }
}

impl<H: HostConfig> Root<H> {
    /// Replaces the root's content with `node` and renders.
    pub fn render(&self, node: impl Into<Node>) -> RenderOutcome {
        update_container(node.into(), self)
    }

    /// Read access to the root state. Updates dispatched from `f` run after
    /// it returns.
    ///
    /// # Panics
    ///
    /// If called while this root is rendering, e.g. from a component body.
    pub fn inspect<R>(&self, f: impl FnOnce(&FiberRootNode<H>) -> R) -> R {
        let result = f(&self.inner.borrow());
        self.flush_deferred();
        result
    }

    /// Runs updates that were deferred because the root was busy. `None` when
    /// there was nothing to run or the root is still busy.
    pub fn flush_deferred(&self) -> Option<RenderOutcome> {
        if self.deferred.borrow().is_empty() {
            return None;
        }
        let mut root = self.inner.try_borrow_mut().ok()?;
        root.drain_deferred(None)
    }

    /// Schedules a render for the tree containing `fiber`.
    pub fn schedule_update_on_fiber(&self, fiber: FiberId) -> RenderOutcome {
        self.scheduler.schedule_update_on_fiber(fiber)
    }
}

pub fn create_container<H: HostConfig>(host: H, container: H::Container) -> Root<H> {
    create_container_with(host, container, RootOptions::default())
}

pub fn create_container_with<H: HostConfig>(
    host: H,
    container: H::Container,
    options: RootOptions,
) -> Root<H> {
    let deferred: DeferredQueue = Rc::default();
    let inner = Rc::new_cyclic(|weak: &Weak<RefCell<FiberRootNode<H>>>| {
        let scheduler = Rc::new(RootScheduler {
            root: weak.clone(),
            deferred: deferred.clone(),
        });
        RefCell::new(FiberRootNode::new(
            host,
            container,
            options,
            scheduler,
            deferred.clone(),
        ))
    });
    let scheduler = {
        let root = inner.borrow();
        log::debug!("created root {:?}", root.current);
        root.scheduler.clone()
    };
    Root {
        inner,
        deferred,
        scheduler,
    }
}

/// Enqueues `node` as the root's next state and renders. Rejected while the
/// root is rendering or being inspected.
pub fn update_container<H: HostConfig>(node: Node, root: &Root<H>) -> RenderOutcome {
    let Ok(mut inner) = root.inner.try_borrow_mut() else {
        log::error!("update_container called while the root is busy; update rejected");
        return RenderOutcome::Rejected;
    };
    let current = inner.current;
    if let Some(queue) = &inner.fibers[current].update_queue {
        enqueue_update(&mut queue.borrow_mut(), create_update(Action::Replace(node)));
    }
    let outcome = inner.schedule_update_on_fiber(current);
    inner
        .drain_deferred(Some(outcome))
        .unwrap_or(RenderOutcome::Unreachable)
}
