//! Child reconciliation: turns the next child description of a fiber into
//! work-in-progress child fibers, reusing the current children where key and
//! type match and recording placements and deletions for the commit phase.

use std::collections::HashMap;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::element::{Element, Key, Node, Props};
use crate::fiber::{FiberArena, FiberId, WorkTag};
use crate::flags::Flags;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ChildReconciler {
    track_side_effects: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ChildKey {
    Key(Key),
    Index(usize),
}

impl ChildReconciler {
    /// Used when the parent already exists in the current tree.
    pub(crate) const UPDATE: Self = Self {
        track_side_effects: true,
    };
    /// Used when the whole parent is new: its children are appended to the
    /// detached parent during completion, so no placement is recorded.
    pub(crate) const MOUNT: Self = Self {
        track_side_effects: false,
    };

    pub(crate) fn reconcile_child_fibers<I: Clone>(
        self,
        fibers: &mut FiberArena<I>,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        new_child: &Node,
    ) -> Option<FiberId> {
        match new_child {
            Node::Element(element) => {
                let child =
                    self.reconcile_single_element(fibers, return_fiber, current_first_child, element);
                Some(self.place_single_child(fibers, child))
            }
            Node::Text(content) => {
                let child =
                    self.reconcile_single_text_node(fibers, return_fiber, current_first_child, content);
                Some(self.place_single_child(fibers, child))
            }
            Node::List(items) => {
                self.reconcile_children_array(fibers, return_fiber, current_first_child, items)
            }
            Node::Empty => {
                self.delete_remaining_children(fibers, return_fiber, current_first_child);
                None
            }
        }
    }

    fn delete_child<I: Clone>(self, fibers: &mut FiberArena<I>, return_fiber: FiberId, child: FiberId) {
        if !self.track_side_effects {
            return;
        }
        let parent = &mut fibers[return_fiber];
        parent.deletions.push(child);
        parent.flags |= Flags::CHILD_DELETION;
    }

    fn delete_remaining_children<I: Clone>(
        self,
        fibers: &mut FiberArena<I>,
        return_fiber: FiberId,
        mut child: Option<FiberId>,
    ) {
        if !self.track_side_effects {
            return;
        }
        while let Some(c) = child {
            self.delete_child(fibers, return_fiber, c);
            child = fibers[c].sibling;
        }
    }

    fn use_fiber<I: Clone>(fibers: &mut FiberArena<I>, fiber: FiberId, props: Rc<Props>) -> FiberId {
        let clone = fibers.create_work_in_progress(fiber, props);
        let node = &mut fibers[clone];
        node.index = 0;
        node.sibling = None;
        clone
    }

    fn reconcile_single_element<I: Clone>(
        self,
        fibers: &mut FiberArena<I>,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        element: &Element,
    ) -> FiberId {
        let mut child = current_first_child;
        while let Some(c) = child {
            let (same_key, same_type, next) = {
                let f = &fibers[c];
                (
                    f.key == element.key,
                    f.element_type.as_ref() == Some(&element.element_type),
                    f.sibling,
                )
            };
            if same_key {
                if same_type {
                    self.delete_remaining_children(fibers, return_fiber, next);
                    let existing = Self::use_fiber(fibers, c, element.props.clone());
                    let node = &mut fibers[existing];
                    node.return_fiber = Some(return_fiber);
                    node.element_type = Some(element.element_type.clone());
                    node.ref_handle = element.ref_handle.clone();
                    return existing;
                }
                // same slot, different type: nothing below can match
                self.delete_remaining_children(fibers, return_fiber, Some(c));
                break;
            }
            self.delete_child(fibers, return_fiber, c);
            child = next;
        }

        let created = fibers.create_fiber_from_element(element);
        fibers[created].return_fiber = Some(return_fiber);
        created
    }

    fn reconcile_single_text_node<I: Clone>(
        self,
        fibers: &mut FiberArena<I>,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        content: &Rc<str>,
    ) -> FiberId {
        if let Some(c) = current_first_child
            && fibers[c].tag == WorkTag::HostText
        {
            let next = fibers[c].sibling;
            self.delete_remaining_children(fibers, return_fiber, next);
            let existing = Self::use_fiber(fibers, c, Rc::new(Props::text(content.clone())));
            fibers[existing].return_fiber = Some(return_fiber);
            return existing;
        }

        self.delete_remaining_children(fibers, return_fiber, current_first_child);
        let created = fibers.create_fiber_from_text(content);
        fibers[created].return_fiber = Some(return_fiber);
        created
    }

    fn place_single_child<I: Clone>(self, fibers: &mut FiberArena<I>, fiber: FiberId) -> FiberId {
        let node = &mut fibers[fiber];
        if self.track_side_effects && node.alternate.is_none() {
            node.flags |= Flags::PLACEMENT;
        }
        fiber
    }

    /// Returns the new `last_placed_index`.
    fn place_child<I: Clone>(
        self,
        fibers: &mut FiberArena<I>,
        new_fiber: FiberId,
        last_placed_index: usize,
    ) -> usize {
        if !self.track_side_effects {
            return last_placed_index;
        }
        let old_index = fibers[new_fiber]
            .alternate
            .and_then(|current| fibers.get(current))
            .map(|current| current.index);
        match old_index {
            Some(old_index) if old_index >= last_placed_index => old_index,
            // moved left past a stable sibling, or brand new
            _ => {
                fibers[new_fiber].flags |= Flags::PLACEMENT;
                last_placed_index
            }
        }
    }

    fn reconcile_children_array<I: Clone>(
        self,
        fibers: &mut FiberArena<I>,
        return_fiber: FiberId,
        current_first_child: Option<FiberId>,
        items: &[Node],
    ) -> Option<FiberId> {
        let mut flat: SmallVec<[&Node; 8]> = SmallVec::new();
        flatten(items, &mut flat);

        let mut existing: HashMap<ChildKey, FiberId> = HashMap::new();
        let mut child = current_first_child;
        while let Some(c) = child {
            let f = &fibers[c];
            let key = match &f.key {
                Some(k) => ChildKey::Key(k.clone()),
                None => ChildKey::Index(f.index),
            };
            let next = f.sibling;
            if let Some(shadowed) = existing.insert(key.clone(), c) {
                log::warn!("duplicate child key {key:?} under {return_fiber:?}; dropping the earlier fiber");
                self.delete_child(fibers, return_fiber, shadowed);
            }
            child = next;
        }

        let mut first: Option<FiberId> = None;
        let mut previous: Option<FiberId> = None;
        let mut last_placed_index = 0;

        for (index, node) in flat.iter().enumerate() {
            let Some(new_fiber) = Self::update_from_map(fibers, &mut existing, index, node) else {
                continue;
            };
            {
                let f = &mut fibers[new_fiber];
                f.index = index;
                f.return_fiber = Some(return_fiber);
                f.sibling = None;
            }
            last_placed_index = self.place_child(fibers, new_fiber, last_placed_index);
            match previous {
                None => first = Some(new_fiber),
                Some(p) => fibers[p].sibling = Some(new_fiber),
            }
            previous = Some(new_fiber);
        }

        if self.track_side_effects {
            let mut remaining: Vec<FiberId> = existing.into_values().collect();
            remaining.sort_by_key(|id| fibers[*id].index);
            for old in remaining {
                self.delete_child(fibers, return_fiber, old);
            }
        }

        first
    }

    fn update_from_map<I: Clone>(
        fibers: &mut FiberArena<I>,
        existing: &mut HashMap<ChildKey, FiberId>,
        index: usize,
        node: &Node,
    ) -> Option<FiberId> {
        match node {
            Node::Text(content) => {
                let key = ChildKey::Index(index);
                if let Some(&old) = existing.get(&key)
                    && fibers[old].tag == WorkTag::HostText
                {
                    existing.remove(&key);
                    return Some(Self::use_fiber(
                        fibers,
                        old,
                        Rc::new(Props::text(content.clone())),
                    ));
                }
                Some(fibers.create_fiber_from_text(content))
            }
            Node::Element(element) => {
                let key = element
                    .key
                    .clone()
                    .map_or(ChildKey::Index(index), ChildKey::Key);
                if let Some(&old) = existing.get(&key)
                    && fibers[old].element_type.as_ref() == Some(&element.element_type)
                {
                    existing.remove(&key);
                    let reused = Self::use_fiber(fibers, old, element.props.clone());
                    let node = &mut fibers[reused];
                    // same component type, but the closure may capture new values
                    node.element_type = Some(element.element_type.clone());
                    node.ref_handle = element.ref_handle.clone();
                    return Some(reused);
                }
                Some(fibers.create_fiber_from_element(element))
            }
            Node::Empty | Node::List(_) => None,
        }
    }
}

/// Nested lists are spliced in place; `Empty` keeps its position.
fn flatten<'a>(items: &'a [Node], out: &mut SmallVec<[&'a Node; 8]>) {
    for item in items {
        match item {
            Node::List(inner) => flatten(inner, out),
            other => out.push(other),
        }
    }
}

/// Reconciles `next_children` into `wip`'s child list.
pub(crate) fn reconcile_children<I: Clone>(fibers: &mut FiberArena<I>, wip: FiberId, next_children: &Node) {
    let current_first_child = fibers[wip]
        .alternate
        .and_then(|current| fibers.get(current))
        .map(|current| current.child);

    let child = match current_first_child {
        Some(first) => ChildReconciler::UPDATE.reconcile_child_fibers(fibers, wip, first, next_children),
        None => ChildReconciler::MOUNT.reconcile_child_fibers(fibers, wip, None, next_children),
    };
    fibers[wip].child = child;
}
