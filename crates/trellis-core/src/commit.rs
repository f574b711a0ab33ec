//! Commit phase: applies a finished tree's host mutations.
//!
//! Runs once per successful cycle, after the whole work-in-progress tree has
//! been rendered and completed. Deletions of a fiber run before its
//! children's effects, placements and updates after them.

use smallvec::SmallVec;

use crate::fiber::{FiberArena, FiberId, WorkTag};
use crate::flags::Flags;
use crate::host::{HostConfig, HostParent};

pub(crate) struct CommitContext<'a, H: HostConfig> {
    pub fibers: &'a mut FiberArena<H::Instance>,
    pub host: &'a mut H,
    pub container: &'a H::Container,
    pub freed: usize,
}

impl<H: HostConfig> CommitContext<'_, H> {
    pub(crate) fn commit_mutation_effects(&mut self, finished_work: FiberId) {
        self.commit_mutation_effects_on_fiber(finished_work);
    }

    fn commit_mutation_effects_on_fiber(&mut self, fiber: FiberId) {
        let deletions = std::mem::take(&mut self.fibers[fiber].deletions);
        for deleted in deletions {
            self.commit_deletion(fiber, deleted);
        }

        if self.fibers[fiber].subtree_flags.intersects(Flags::MUTATION_MASK) {
            let children: SmallVec<[FiberId; 8]> = self.fibers.children(fiber).collect();
            for child in children {
                self.commit_mutation_effects_on_fiber(child);
            }
        }

        let flags = self.fibers[fiber].flags;
        if flags.contains(Flags::PLACEMENT) {
            self.commit_placement(fiber);
        }
        if flags.contains(Flags::UPDATE) {
            self.commit_work(fiber);
        }

        let node = &mut self.fibers[fiber];
        node.flags &= Flags::PERFORMED_WORK;
        node.subtree_flags = Flags::NONE;
    }

    /// Nearest host node at or above `fiber`.
    fn host_parent_from(&self, fiber: FiberId) -> Option<HostParent<H>> {
        let mut node = Some(fiber);
        while let Some(id) = node {
            let f = self.fibers.get(id)?;
            match f.tag {
                WorkTag::HostComponent => {
                    return f.state_node.clone().map(HostParent::Instance);
                }
                WorkTag::HostRoot => return Some(HostParent::Container(self.container.clone())),
                WorkTag::HostText | WorkTag::FunctionComponent => node = f.return_fiber,
            }
        }
        None
    }

    fn commit_deletion(&mut self, parent_fiber: FiberId, deleted: FiberId) {
        match self.host_parent_from(parent_fiber) {
            Some(parent) => self.remove_host_children(&parent, deleted),
            None => log::error!(
                "no host parent for deleted {}",
                self.fibers[deleted].describe()
            ),
        }
        self.freed += self.fibers.free_subtree(deleted);
    }

    /// Removes the topmost host nodes of a deleted subtree; their own
    /// descendants go with them.
    fn remove_host_children(&mut self, parent: &HostParent<H>, fiber: FiberId) {
        let f = &self.fibers[fiber];
        if f.tag.is_host() {
            if let Some(instance) = &f.state_node {
                parent.remove(self.host, instance);
            }
            return;
        }
        let children: SmallVec<[FiberId; 8]> = self.fibers.children(fiber).collect();
        for child in children {
            self.remove_host_children(parent, child);
        }
    }

    fn commit_placement(&mut self, fiber: FiberId) {
        let parent = self.fibers[fiber]
            .return_fiber
            .and_then(|p| self.host_parent_from(p));
        let Some(parent) = parent else {
            log::error!("no host parent for placed {}", self.fibers[fiber].describe());
            return;
        };
        let before = self.get_host_sibling(fiber);
        self.insert_or_append_placement_node(fiber, before.as_ref(), &parent);
    }

    /// First host node after `fiber` that is already in the host tree.
    fn get_host_sibling(&self, fiber: FiberId) -> Option<H::Instance> {
        let fibers = &*self.fibers;
        let mut node = fiber;
        'siblings: loop {
            let sibling = loop {
                if let Some(sibling) = fibers[node].sibling {
                    break sibling;
                }
                let parent = fibers[node].return_fiber?;
                if fibers[parent].tag != WorkTag::FunctionComponent {
                    return None;
                }
                node = parent;
            };
            node = sibling;

            while !fibers[node].tag.is_host() {
                if fibers[node].flags.contains(Flags::PLACEMENT) {
                    continue 'siblings;
                }
                match fibers[node].child {
                    Some(child) => node = child,
                    None => continue 'siblings,
                }
            }

            if !fibers[node].flags.contains(Flags::PLACEMENT) {
                return fibers[node].state_node.clone();
            }
        }
    }

    fn insert_or_append_placement_node(
        &mut self,
        fiber: FiberId,
        before: Option<&H::Instance>,
        parent: &HostParent<H>,
    ) {
        let f = &self.fibers[fiber];
        if f.tag.is_host() {
            if let Some(instance) = &f.state_node {
                match before {
                    Some(before) => parent.insert_before(self.host, instance, before),
                    None => parent.append(self.host, instance),
                }
            }
            return;
        }
        let children: SmallVec<[FiberId; 8]> = self.fibers.children(fiber).collect();
        for child in children {
            self.insert_or_append_placement_node(child, before, parent);
        }
    }

    fn commit_work(&mut self, fiber: FiberId) {
        let f = &self.fibers[fiber];
        let Some(instance) = &f.state_node else {
            return;
        };
        let old_props = f
            .alternate
            .and_then(|current| self.fibers.get(current))
            .and_then(|current| current.memoized_props.clone());
        let new_props = f.memoized_props.clone().unwrap_or_else(|| f.pending_props.clone());

        match f.tag {
            WorkTag::HostComponent => {
                let ty = f.element_type.as_ref().map(|t| t.name()).unwrap_or_default();
                let old_props = old_props.unwrap_or_default();
                self.host.commit_update(instance, ty, &old_props, &new_props);
            }
            WorkTag::HostText => {
                let old_text = old_props
                    .as_ref()
                    .and_then(|p| p.text_content().cloned())
                    .unwrap_or_default();
                let new_text = new_props.text_content().cloned().unwrap_or_default();
                self.host.commit_text_update(instance, &old_text, &new_text);
            }
            WorkTag::HostRoot | WorkTag::FunctionComponent => {}
        }
    }
}
