//! Fiber nodes and the arena that owns them.
//!
//! Fibers are stored in a generational [`SlotMap`]. `child` and `sibling` are
//! the owning links (freeing walks them); `return_fiber` and `alternate` are
//! lookups only. A stale id never aliases a different fiber, it just fails to
//! resolve.

use std::ops::{Index, IndexMut};
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::element::{Element, ElementType, Key, Node, Props, Ref};
use crate::flags::Flags;
use crate::hooks::HookChain;
use crate::update_queue::SharedQueue;

new_key_type! {
    /// Identifier of a fiber inside its root's arena.
    pub struct FiberId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkTag {
    FunctionComponent,
    HostRoot,
    HostComponent,
    HostText,
}

impl WorkTag {
    pub fn is_host(self) -> bool {
        matches!(self, WorkTag::HostComponent | WorkTag::HostText)
    }
}

#[derive(Clone, Debug, Default)]
pub enum MemoizedState {
    #[default]
    None,
    /// The root's application state: the top-level node.
    Root(Node),
    /// A function component's hook chain.
    Hooks(HookChain),
}

impl MemoizedState {
    pub fn hooks(&self) -> Option<&HookChain> {
        match self {
            MemoizedState::Hooks(chain) => Some(chain),
            _ => None,
        }
    }

    pub fn root_node(&self) -> Option<&Node> {
        match self {
            MemoizedState::Root(node) => Some(node),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct FiberNode<I> {
    pub tag: WorkTag,
    pub key: Option<Key>,
    pub element_type: Option<ElementType>,
    pub state_node: Option<I>,

    pub return_fiber: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    pub index: usize,
    pub ref_handle: Option<Ref>,

    pub pending_props: Rc<Props>,
    pub memoized_props: Option<Rc<Props>>,
    pub memoized_state: MemoizedState,
    pub update_queue: Option<SharedQueue<Node>>,

    pub alternate: Option<FiberId>,
    pub flags: Flags,
    pub subtree_flags: Flags,
    pub deletions: Vec<FiberId>,
}

impl<I> FiberNode<I> {
    pub fn new(tag: WorkTag, pending_props: Rc<Props>, key: Option<Key>) -> Self {
        Self {
            tag,
            key,
            element_type: None,
            state_node: None,
            return_fiber: None,
            child: None,
            sibling: None,
            index: 0,
            ref_handle: None,
            pending_props,
            memoized_props: None,
            memoized_state: MemoizedState::None,
            update_queue: None,
            alternate: None,
            flags: Flags::NONE,
            subtree_flags: Flags::NONE,
            deletions: Vec::new(),
        }
    }

    /// Human-readable name used in logs and errors.
    pub fn describe(&self) -> String {
        match (&self.tag, &self.element_type) {
            (WorkTag::HostRoot, _) => "HostRoot".to_string(),
            (WorkTag::HostText, _) => "#text".to_string(),
            (WorkTag::HostComponent, Some(t)) => format!("<{}>", t.name()),
            (WorkTag::FunctionComponent, Some(t)) => t.name().to_string(),
            (tag, None) => format!("{tag:?}"),
        }
    }
}

pub struct FiberArena<I> {
    nodes: SlotMap<FiberId, FiberNode<I>>,
    // allocations of the cycle in flight, freed again if it aborts
    created: Vec<FiberId>,
}

impl<I> Default for FiberArena<I> {
    fn default() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            created: Vec::new(),
        }
    }
}

impl<I> Index<FiberId> for FiberArena<I> {
    type Output = FiberNode<I>;

    fn index(&self, id: FiberId) -> &FiberNode<I> {
        &self.nodes[id]
    }
}

impl<I> IndexMut<FiberId> for FiberArena<I> {
    fn index_mut(&mut self, id: FiberId) -> &mut FiberNode<I> {
        &mut self.nodes[id]
    }
}

impl<I: Clone> FiberArena<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: FiberId) -> Option<&FiberNode<I>> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut FiberNode<I>> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.nodes.contains_key(id)
    }

    pub(crate) fn alloc(&mut self, node: FiberNode<I>) -> FiberId {
        let id = self.nodes.insert(node);
        self.created.push(id);
        id
    }

    /// Allocates a fiber that survives cycle aborts (the host root).
    pub(crate) fn alloc_persistent(&mut self, node: FiberNode<I>) -> FiberId {
        self.nodes.insert(node)
    }

    /// Iterates `id`'s children in sibling order.
    pub fn children(&self, id: FiberId) -> Children<'_, I> {
        Children {
            arena: self,
            next: self.get(id).and_then(|f| f.child),
        }
    }

    /// Returns the work-in-progress counterpart of `current`, reusing the
    /// alternate from an earlier cycle when there is one.
    pub fn create_work_in_progress(&mut self, current: FiberId, pending_props: Rc<Props>) -> FiberId {
        let (tag, key) = {
            let c = &self.nodes[current];
            (c.tag, c.key.clone())
        };

        let wip = match self.nodes[current].alternate.filter(|a| self.nodes.contains_key(*a)) {
            Some(wip) => {
                let w = &mut self.nodes[wip];
                w.pending_props = pending_props;
                w.flags = Flags::NONE;
                w.subtree_flags = Flags::NONE;
                w.deletions.clear();
                wip
            }
            None => {
                let mut node = FiberNode::new(tag, pending_props, key);
                node.state_node = self.nodes[current].state_node.clone();
                node.alternate = Some(current);
                let wip = self.alloc(node);
                self.nodes[current].alternate = Some(wip);
                wip
            }
        };

        let c = &self.nodes[current];
        let element_type = c.element_type.clone();
        let update_queue = c.update_queue.clone();
        let child = c.child;
        let sibling = c.sibling;
        let index = c.index;
        let ref_handle = c.ref_handle.clone();
        let memoized_props = c.memoized_props.clone();
        let memoized_state = c.memoized_state.clone();

        let w = &mut self.nodes[wip];
        w.element_type = element_type;
        w.update_queue = update_queue;
        w.child = child;
        w.sibling = sibling;
        w.index = index;
        w.ref_handle = ref_handle;
        w.memoized_props = memoized_props;
        w.memoized_state = memoized_state;
        wip
    }

    pub fn create_fiber_from_element(&mut self, element: &Element) -> FiberId {
        let tag = match element.element_type {
            ElementType::Host(_) => WorkTag::HostComponent,
            ElementType::Function(_) => WorkTag::FunctionComponent,
        };
        let mut node = FiberNode::new(tag, element.props.clone(), element.key.clone());
        node.element_type = Some(element.element_type.clone());
        node.ref_handle = element.ref_handle.clone();
        self.alloc(node)
    }

    pub fn create_fiber_from_text(&mut self, content: &Rc<str>) -> FiberId {
        self.alloc(FiberNode::new(
            WorkTag::HostText,
            Rc::new(Props::text(content.clone())),
            None,
        ))
    }

    /// Frees `id`, its descendants and their alternates. Returns how many
    /// fibers were removed.
    pub fn free_subtree(&mut self, id: FiberId) -> usize {
        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.remove(next) else {
                continue;
            };
            freed += 1;
            if let Some(alt) = node.alternate
                && self.nodes.remove(alt).is_some()
            {
                freed += 1;
            }
            stack.extend(node.child);
            stack.extend(node.sibling.filter(|_| next != id));
        }
        freed
    }

    /// Frees every fiber allocated since the last [`FiberArena::commit_created`]
    /// and unlinks them from the alternates they were paired with.
    pub(crate) fn discard_created(&mut self) -> usize {
        let created = std::mem::take(&mut self.created);
        let mut freed = 0;
        for id in created {
            let Some(node) = self.nodes.remove(id) else {
                continue;
            };
            freed += 1;
            if let Some(alt) = node.alternate
                && let Some(alt) = self.nodes.get_mut(alt)
                && alt.alternate == Some(id)
            {
                alt.alternate = None;
            }
        }
        freed
    }

    pub(crate) fn commit_created(&mut self) -> usize {
        let n = self.created.len();
        self.created.clear();
        n
    }
}

pub struct Children<'a, I> {
    arena: &'a FiberArena<I>,
    next: Option<FiberId>,
}

impl<I> Iterator for Children<'_, I> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        let id = self.next?;
        self.next = self.arena.nodes.get(id).and_then(|f| f.sibling);
        Some(id)
    }
}
