use std::rc::Rc;

use crate::child_fiber::reconcile_children;
use crate::error::{RenderError, WorkLoopError};
use crate::fiber::{FiberArena, FiberId, MemoizedState, WorkTag};
use crate::flags::Flags;
use crate::hooks::{ScheduleUpdate, render_with_hooks};
use crate::update_queue::{ProcessedState, QueueMode, process_update_list};

/// Processes `wip` and returns the first child to work on next.
pub(crate) fn begin_work<I: Clone>(
    fibers: &mut FiberArena<I>,
    wip: FiberId,
    scheduler: &Rc<dyn ScheduleUpdate>,
    queue_mode: QueueMode,
) -> Result<Option<FiberId>, WorkLoopError> {
    log::trace!("begin_work {}", fibers[wip].describe());
    match fibers[wip].tag {
        WorkTag::HostRoot => Ok(update_host_root(fibers, wip)),
        WorkTag::HostComponent => Ok(update_host_component(fibers, wip)),
        WorkTag::HostText => Ok(None),
        WorkTag::FunctionComponent => update_function_component(fibers, wip, scheduler, queue_mode)
            .map_err(|source| WorkLoopError::Render {
                fiber: wip,
                component: fibers
                    .get(wip)
                    .map(|f| f.describe())
                    .unwrap_or_else(|| "<freed>".to_string()),
                source,
            }),
    }
}

fn update_host_root<I: Clone>(fibers: &mut FiberArena<I>, wip: FiberId) -> Option<FiberId> {
    let base_state = fibers[wip]
        .memoized_state
        .root_node()
        .cloned()
        .unwrap_or_default();
    let pending = fibers[wip]
        .update_queue
        .as_ref()
        .map(|queue| queue.borrow_mut().take_pending())
        .unwrap_or_default();

    let ProcessedState { memoized_state } = process_update_list(base_state, pending);
    fibers[wip].memoized_state = MemoizedState::Root(memoized_state.clone());

    reconcile_children(fibers, wip, &memoized_state);
    fibers[wip].child
}

fn update_host_component<I: Clone>(fibers: &mut FiberArena<I>, wip: FiberId) -> Option<FiberId> {
    let props = fibers[wip].pending_props.clone();
    reconcile_children(fibers, wip, &props.children);
    fibers[wip].child
}

fn update_function_component<I: Clone>(
    fibers: &mut FiberArena<I>,
    wip: FiberId,
    scheduler: &Rc<dyn ScheduleUpdate>,
    queue_mode: QueueMode,
) -> Result<Option<FiberId>, RenderError> {
    let next_children = render_with_hooks(fibers, wip, scheduler, queue_mode)?;
    fibers[wip].flags |= Flags::PERFORMED_WORK;
    reconcile_children(fibers, wip, &next_children);
    Ok(fibers[wip].child)
}
