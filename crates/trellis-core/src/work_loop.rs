//! The work loop: drives one render cycle from an update to a commit.
//!
//! A cycle clones the committed tree into a work-in-progress tree one fiber at
//! a time (`begin_work` going down, `complete_work` coming back up), then
//! commits it. Anything that goes wrong before the commit, including a panic
//! in a component, drops the work-in-progress tree and leaves the committed
//! tree and the host as they were.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use web_time::{Duration, Instant};

use crate::begin_work::begin_work;
use crate::commit::CommitContext;
use crate::complete_work::complete_work;
use crate::error::WorkLoopError;
use crate::fiber::{FiberId, WorkTag};
use crate::host::HostConfig;
use crate::root::FiberRootNode;

/// Result of asking a root to render.
#[derive(Debug)]
pub enum RenderOutcome {
    /// The cycle finished and its tree is now `current`.
    Committed,
    /// The cycle failed before commit; nothing visible changed.
    Aborted(WorkLoopError),
    /// The fiber is not (or no longer) part of a live tree.
    Unreachable,
    /// The root was busy; the update runs once it is released.
    Deferred,
    /// `update_container` was called while the root was busy.
    Rejected,
}

impl RenderOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, RenderOutcome::Committed)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RenderOutcome::Aborted(_))
    }

    pub fn error(&self) -> Option<&WorkLoopError> {
        match self {
            RenderOutcome::Aborted(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CommitStats {
    pub units_of_work: usize,
    pub fibers_allocated: usize,
    pub fibers_freed: usize,
    pub duration: Duration,
}

impl<H: HostConfig> FiberRootNode<H> {
    /// Finds the root that owns `fiber` and renders it.
    pub(crate) fn schedule_update_on_fiber(&mut self, fiber: FiberId) -> RenderOutcome {
        if self.mark_update_from_fiber_to_root(fiber).is_none() {
            log::debug!("update on {fiber:?} does not reach this root");
            if self.options.dev_diagnostics {
                log::warn!("state update on a fiber that is no longer mounted ({fiber:?})");
            }
            return RenderOutcome::Unreachable;
        }
        self.render_root()
    }

    fn mark_update_from_fiber_to_root(&self, fiber: FiberId) -> Option<FiberId> {
        let mut node = fiber;
        while let Some(parent) = self.fibers.get(node)?.return_fiber {
            node = parent;
        }
        let top = self.fibers.get(node)?;
        let owned = node == self.current || top.alternate == Some(self.current);
        (top.tag == WorkTag::HostRoot && owned).then_some(node)
    }

    fn prepare_fresh_stack(&mut self) -> FiberId {
        self.finished_work = None;
        self.units_of_work = 0;
        let props = self.fibers[self.current].pending_props.clone();
        let wip = self.fibers.create_work_in_progress(self.current, props);
        self.work_in_progress = Some(wip);
        wip
    }

    pub(crate) fn render_root(&mut self) -> RenderOutcome {
        let started = Instant::now();
        let root_wip = self.prepare_fresh_stack();

        let result = catch_unwind(AssertUnwindSafe(|| self.work_loop())).unwrap_or_else(|payload| {
            Err(WorkLoopError::Panicked {
                message: panic_message(payload.as_ref()),
            })
        });

        match result {
            Ok(()) => {
                self.finished_work = Some(root_wip);
                self.commit_root(started);
                RenderOutcome::Committed
            }
            Err(error) => {
                log::warn!("render aborted: {error}");
                self.work_in_progress = None;
                let freed = self.fibers.discard_created();
                log::debug!("discarded {freed} fibers of the aborted cycle");
                RenderOutcome::Aborted(error)
            }
        }
    }

    fn work_loop(&mut self) -> Result<(), WorkLoopError> {
        while let Some(unit) = self.work_in_progress {
            self.perform_unit_of_work(unit)?;
        }
        Ok(())
    }

    fn perform_unit_of_work(&mut self, unit: FiberId) -> Result<(), WorkLoopError> {
        let next = begin_work(&mut self.fibers, unit, &self.scheduler, self.options.queue_mode)?;
        let fiber = &mut self.fibers[unit];
        fiber.memoized_props = Some(fiber.pending_props.clone());
        self.units_of_work += 1;

        match next {
            Some(child) => self.work_in_progress = Some(child),
            None => self.complete_unit_of_work(unit),
        }
        Ok(())
    }

    fn complete_unit_of_work(&mut self, unit: FiberId) {
        let mut completed = Some(unit);
        while let Some(fiber) = completed {
            complete_work(&mut self.fibers, &mut self.host, fiber);
            if let Some(sibling) = self.fibers[fiber].sibling {
                self.work_in_progress = Some(sibling);
                return;
            }
            completed = self.fibers[fiber].return_fiber;
            self.work_in_progress = completed;
        }
    }

    fn commit_root(&mut self, started: Instant) {
        let Some(finished_work) = self.finished_work.take() else {
            return;
        };

        let mut commit = CommitContext {
            fibers: &mut self.fibers,
            host: &mut self.host,
            container: &self.container,
            freed: 0,
        };
        commit.commit_mutation_effects(finished_work);
        let fibers_freed = commit.freed;

        self.current = finished_work;
        self.work_in_progress = None;
        self.commit_count += 1;

        let stats = CommitStats {
            units_of_work: self.units_of_work,
            fibers_allocated: self.fibers.commit_created(),
            fibers_freed,
            duration: started.elapsed(),
        };
        log::debug!(
            "commit #{}: {} units, +{} -{} fibers in {:?}",
            self.commit_count,
            stats.units_of_work,
            stats.fibers_allocated,
            stats.fibers_freed,
            stats.duration
        );
        self.last_stats = Some(stats);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
