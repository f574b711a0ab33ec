//! # Hooks
//!
//! Function components keep state across renders through hooks. A component
//! receives a [`Hooks`] render context; calling `use_state` on it claims the
//! next positional slot of the fiber's [`HookChain`]:
//!
//! ```rust
//! use trellis_core::*;
//!
//! #[allow(non_snake_case)]
//! fn Counter(hooks: &mut Hooks<'_>, _props: &Props) -> RenderResult {
//!     let (count, set_count) = hooks.use_state(0)?;
//!     Ok(h("button")
//!         .on("click", move || {
//!             set_count.update(|n| n + 1);
//!         })
//!         .child(format!("Count = {count}"))
//!         .into())
//! }
//! ```
//!
//! - Hooks are order-based: the Nth call on one render is paired with the Nth
//!   call on the previous render. Changing the number of calls or the state
//!   type at a position aborts the render with a [`HookError`].
//! - There is no global "currently rendering" pointer. Holding `&mut Hooks` is
//!   the permission to use hooks, so a hook cannot run outside a render body.
//! - [`Dispatch`] handles outlive the render. Dispatching enqueues an update on
//!   the hook's queue and asks the owning root for a new cycle.

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::element::{ElementType, Node};
use crate::error::{HookError, RenderResult};
use crate::fiber::{FiberArena, FiberId, MemoizedState};
use crate::update_queue::{
    Action, ProcessedState, QueueMode, SharedQueue, UpdateQueue, create_update, enqueue_update,
    process_update_list,
};
use crate::work_loop::RenderOutcome;

/// One positional state slot.
#[derive(Clone)]
pub struct Hook {
    pub memoized_state: Rc<dyn Any>,
    /// The slot's private `SharedQueue<S>`, type-erased.
    pub queue: Option<Rc<dyn Any>>,
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("has_queue", &self.queue.is_some())
            .finish_non_exhaustive()
    }
}

/// Hooks of one fiber in call order; position `n + 1` is the `next` of
/// position `n`.
#[derive(Clone, Debug, Default)]
pub struct HookChain {
    hooks: Vec<Hook>,
}

impl HookChain {
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Hook> {
        self.hooks.get(index)
    }

    /// State stored at `index`, if it holds an `S`.
    pub fn state<S: Clone + 'static>(&self, index: usize) -> Option<S> {
        self.get(index)?.memoized_state.downcast_ref::<S>().cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hook> {
        self.hooks.iter()
    }
}

/// Entry point back into the work loop, implemented by the root that owns the
/// fiber.
pub trait ScheduleUpdate {
    fn schedule_update_on_fiber(&self, fiber: FiberId) -> RenderOutcome;
}

enum Dispatcher {
    OnMount,
    OnUpdate { current: HookChain },
}

/// Render context handed to a component.
pub struct Hooks<'a> {
    fiber: FiberId,
    dispatcher: Dispatcher,
    work_in_progress: HookChain,
    cursor: usize,
    scheduler: &'a Rc<dyn ScheduleUpdate>,
    queue_mode: QueueMode,
}

impl fmt::Debug for Hooks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("fiber", &self.fiber)
            .field("mounting", &self.is_mounting())
            .field("hooks", &self.work_in_progress.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Hooks<'a> {
    fn new(
        fiber: FiberId,
        dispatcher: Dispatcher,
        scheduler: &'a Rc<dyn ScheduleUpdate>,
        queue_mode: QueueMode,
    ) -> Self {
        Self {
            fiber,
            dispatcher,
            work_in_progress: HookChain::default(),
            cursor: 0,
            scheduler,
            queue_mode,
        }
    }

    /// The fiber being rendered.
    pub fn fiber(&self) -> FiberId {
        self.fiber
    }

    pub fn is_mounting(&self) -> bool {
        matches!(self.dispatcher, Dispatcher::OnMount)
    }

    pub fn use_state<S: Clone + 'static>(&mut self, initial: S) -> Result<(S, Dispatch<S>), HookError> {
        self.use_state_with(move || initial)
    }

    /// Like [`Hooks::use_state`], computing the initial value only on mount.
    pub fn use_state_with<S: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> S,
    ) -> Result<(S, Dispatch<S>), HookError> {
        match self.dispatcher {
            Dispatcher::OnMount => Ok(self.mount_state(init)),
            Dispatcher::OnUpdate { .. } => self.update_state(),
        }
    }

    pub fn use_reducer<S, A, R>(
        &mut self,
        reducer: R,
        initial: S,
    ) -> Result<(S, ReducerDispatch<S, A>), HookError>
    where
        S: Clone + 'static,
        A: 'static,
        R: Fn(&S, &A) -> S + 'static,
    {
        let (state, dispatch) = self.use_state(initial)?;
        Ok((
            state,
            ReducerDispatch {
                inner: dispatch,
                reducer: Rc::new(reducer),
            },
        ))
    }

    fn mount_work_in_progress_hook(&mut self, hook: Hook) -> usize {
        self.work_in_progress.hooks.push(hook);
        self.work_in_progress.hooks.len() - 1
    }

    fn update_work_in_progress_hook(&mut self) -> Result<Hook, HookError> {
        let index = self.cursor;
        let Dispatcher::OnUpdate { current } = &self.dispatcher else {
            return Err(HookError::RenderedMoreHooks { index });
        };
        let hook = current
            .get(index)
            .cloned()
            .ok_or(HookError::RenderedMoreHooks { index })?;
        self.cursor += 1;
        Ok(hook)
    }

    fn mount_state<S: Clone + 'static>(&mut self, init: impl FnOnce() -> S) -> (S, Dispatch<S>) {
        let state = init();
        let queue: SharedQueue<S> = Rc::new(RefCell::new(UpdateQueue::with_mode(self.queue_mode)));
        let index = self.mount_work_in_progress_hook(Hook {
            memoized_state: Rc::new(state.clone()),
            queue: Some(queue.clone() as Rc<dyn Any>),
        });
        log::trace!("mounted state hook #{index} on {:?}", self.fiber);
        (state, self.bind_dispatch(queue))
    }

    fn update_state<S: Clone + 'static>(&mut self) -> Result<(S, Dispatch<S>), HookError> {
        let index = self.cursor;
        let current = self.update_work_in_progress_hook()?;
        let mismatch = || HookError::TypeMismatch {
            index,
            expected: type_name::<S>(),
        };

        let base_state = current
            .memoized_state
            .downcast_ref::<S>()
            .cloned()
            .ok_or_else(mismatch)?;
        let queue = current
            .queue
            .and_then(|q| q.downcast::<RefCell<UpdateQueue<S>>>().ok())
            .ok_or_else(mismatch)?;

        let pending = queue.borrow_mut().take_pending();
        let ProcessedState { memoized_state } = process_update_list(base_state, pending);

        self.work_in_progress.hooks.push(Hook {
            memoized_state: Rc::new(memoized_state.clone()),
            queue: Some(queue.clone() as Rc<dyn Any>),
        });
        Ok((memoized_state, self.bind_dispatch(queue)))
    }

    fn bind_dispatch<S: 'static>(&self, queue: SharedQueue<S>) -> Dispatch<S> {
        Dispatch {
            fiber: self.fiber,
            queue,
            scheduler: self.scheduler.clone(),
        }
    }

    fn finish(self) -> Result<HookChain, HookError> {
        if let Dispatcher::OnUpdate { current } = &self.dispatcher
            && self.cursor < current.len()
        {
            return Err(HookError::RenderedFewerHooks {
                rendered: self.cursor,
                expected: current.len(),
            });
        }
        Ok(self.work_in_progress)
    }
}

/// Setter returned by `use_state`.
pub struct Dispatch<S: 'static> {
    fiber: FiberId,
    queue: SharedQueue<S>,
    scheduler: Rc<dyn ScheduleUpdate>,
}

impl<S: 'static> Clone for Dispatch<S> {
    fn clone(&self) -> Self {
        Self {
            fiber: self.fiber,
            queue: self.queue.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

/// Handles are equal when they feed the same hook queue.
impl<S: 'static> PartialEq for Dispatch<S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.queue, &other.queue)
    }
}

impl<S: 'static> fmt::Debug for Dispatch<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("fiber", &self.fiber)
            .field("state", &type_name::<S>())
            .finish()
    }
}

impl<S: 'static> Dispatch<S> {
    pub fn dispatch(&self, action: Action<S>) -> RenderOutcome {
        enqueue_update(&mut self.queue.borrow_mut(), create_update(action));
        self.scheduler.schedule_update_on_fiber(self.fiber)
    }

    pub fn set(&self, value: S) -> RenderOutcome {
        self.dispatch(Action::Replace(value))
    }

    pub fn update(&self, f: impl Fn(&S) -> S + 'static) -> RenderOutcome {
        self.dispatch(Action::updater(f))
    }

    /// The fiber this handle was bound to.
    pub fn fiber(&self) -> FiberId {
        self.fiber
    }
}

pub struct ReducerDispatch<S: 'static, A: 'static> {
    inner: Dispatch<S>,
    reducer: Rc<dyn Fn(&S, &A) -> S>,
}

impl<S: 'static, A: 'static> Clone for ReducerDispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            reducer: self.reducer.clone(),
        }
    }
}

impl<S: 'static, A: 'static> fmt::Debug for ReducerDispatch<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReducerDispatch").field(&self.inner).finish()
    }
}

impl<S: 'static, A: 'static> ReducerDispatch<S, A> {
    pub fn dispatch(&self, action: A) -> RenderOutcome {
        let reducer = self.reducer.clone();
        self.inner
            .dispatch(Action::updater(move |state: &S| reducer(state, &action)))
    }
}

/// Renders the function component at `wip`, selecting the mount or update
/// dispatcher by whether the fiber has an alternate, and stores the new hook
/// chain on it.
pub(crate) fn render_with_hooks<I: Clone>(
    fibers: &mut FiberArena<I>,
    wip: FiberId,
    scheduler: &Rc<dyn ScheduleUpdate>,
    queue_mode: QueueMode,
) -> RenderResult {
    let (element_type, props, alternate) = {
        let fiber = &mut fibers[wip];
        fiber.memoized_state = MemoizedState::None;
        (
            fiber.element_type.clone(),
            fiber.pending_props.clone(),
            fiber.alternate,
        )
    };

    let dispatcher = match alternate.and_then(|id| fibers.get(id)) {
        Some(current) => Dispatcher::OnUpdate {
            current: current.memoized_state.hooks().cloned().unwrap_or_default(),
        },
        None => Dispatcher::OnMount,
    };

    let Some(ElementType::Function(component)) = element_type else {
        log::error!("function component fiber {wip:?} has no component type");
        return Ok(Node::Empty);
    };

    let mut hooks = Hooks::new(wip, dispatcher, scheduler, queue_mode);
    let children = component.render(&mut hooks, &props)?;
    let chain = hooks.finish()?;
    fibers[wip].memoized_state = MemoizedState::Hooks(chain);
    Ok(children)
}
