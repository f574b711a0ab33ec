//! In-memory host.
//!
//! [`MemoryHost`] renders into a tree of reference-counted [`MemNode`]s. It is
//! what the tests, demos and devtools render into: the tree can be printed as
//! markup, callbacks stored in props can be fired, and every host call is
//! appended to a shared [`OpLog`].
//!
//! ```rust
//! use trellis_core::*;
//!
//! let host = MemoryHost::new();
//! let container = MemNode::container();
//! let root = create_container(host, container.clone());
//! root.render(h("p").child("hello"));
//! assert_eq!(container.to_markup(), "<p>hello</p>");
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::element::{PropValue, Props};
use crate::host::HostConfig;

#[derive(Clone, Debug)]
pub enum MemKind {
    Container,
    Element {
        tag: Rc<str>,
        attributes: BTreeMap<Rc<str>, PropValue>,
    },
    Text(String),
}

struct MemNodeData {
    id: u64,
    kind: MemKind,
    children: Vec<MemNode>,
}

#[derive(Clone)]
pub struct MemNode(Rc<RefCell<MemNodeData>>);

impl PartialEq for MemNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemNode {}

impl fmt::Debug for MemNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        match &data.kind {
            MemKind::Container => write!(f, "#{} <container>", data.id),
            MemKind::Element { tag, .. } => write!(f, "#{} <{tag}>", data.id),
            MemKind::Text(text) => write!(f, "#{} {text:?}", data.id),
        }
    }
}

impl MemNode {
    fn new(id: u64, kind: MemKind) -> Self {
        Self(Rc::new(RefCell::new(MemNodeData {
            id,
            kind,
            children: Vec::new(),
        })))
    }

    /// A fresh mount target.
    pub fn container() -> Self {
        Self::new(0, MemKind::Container)
    }

    pub fn id(&self) -> u64 {
        self.0.borrow().id
    }

    pub fn kind(&self) -> MemKind {
        self.0.borrow().kind.clone()
    }

    pub fn tag(&self) -> Option<Rc<str>> {
        match &self.0.borrow().kind {
            MemKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<PropValue> {
        match &self.0.borrow().kind {
            MemKind::Element { attributes, .. } => attributes.get(name).cloned(),
            _ => None,
        }
    }

    pub fn children(&self) -> Vec<MemNode> {
        self.0.borrow().children.clone()
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let data = self.0.borrow();
        match &data.kind {
            MemKind::Text(text) => text.clone(),
            _ => data.children.iter().map(MemNode::text_content).collect(),
        }
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        let data = self.0.borrow();
        match &data.kind {
            MemKind::Text(text) => out.push_str(text),
            MemKind::Container => data.children.iter().for_each(|c| c.write_markup(out)),
            MemKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    match value {
                        PropValue::Callback(_) | PropValue::Bool(false) => {}
                        PropValue::Bool(true) => {
                            out.push(' ');
                            out.push_str(name);
                        }
                        other => out.push_str(&format!(" {name}=\"{other}\"")),
                    }
                }
                out.push('>');
                data.children.iter().for_each(|c| c.write_markup(out));
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    /// Depth-first search, this node included.
    pub fn find(&self, pred: &dyn Fn(&MemNode) -> bool) -> Option<MemNode> {
        if pred(self) {
            return Some(self.clone());
        }
        self.children().iter().find_map(|c| c.find(pred))
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<MemNode> {
        self.find(&|n| n.tag().as_deref() == Some(tag))
    }

    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<MemNode> {
        self.find(&|n| matches!(n.attribute(name), Some(PropValue::Str(s)) if &*s == value))
    }

    /// Invokes the callback stored under `event`. Returns whether one was found.
    pub fn fire(&self, event: &str) -> bool {
        // the callback may re-render into this tree: release the borrow first
        let Some(PropValue::Callback(cb)) = self.attribute(event) else {
            return false;
        };
        cb();
        true
    }

    pub fn click(&self) -> bool {
        self.fire("click")
    }

    fn detach(&self, child: &MemNode) -> bool {
        let mut data = self.0.borrow_mut();
        let before = data.children.len();
        data.children.retain(|c| c != child);
        data.children.len() != before
    }

    fn push(&self, child: &MemNode) {
        self.detach(child);
        self.0.borrow_mut().children.push(child.clone());
    }

    fn insert_before(&self, child: &MemNode, before: &MemNode) {
        self.detach(child);
        let mut data = self.0.borrow_mut();
        match data.children.iter().position(|c| c == before) {
            Some(at) => data.children.insert(at, child.clone()),
            None => {
                log::warn!("insert_before: {before:?} is not a child of #{}; appending", data.id);
                data.children.push(child.clone());
            }
        }
    }
}

/// One recorded host call. Ids are [`MemNode::id`]s; the container is `0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    CreateInstance { id: u64, tag: String },
    CreateText { id: u64, text: String },
    AppendInitialChild { parent: u64, child: u64 },
    AppendChild { parent: u64, child: u64 },
    InsertBefore { parent: u64, child: u64, before: u64 },
    RemoveChild { parent: u64, child: u64 },
    CommitUpdate { id: u64 },
    CommitTextUpdate { id: u64, text: String },
}

impl HostOp {
    /// Whether the op touches a node that may already be attached. Creation
    /// and initial appends only build detached subtrees.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            HostOp::CreateInstance { .. }
                | HostOp::CreateText { .. }
                | HostOp::AppendInitialChild { .. }
        )
    }
}

/// Shared record of host calls, readable after the host moved into a root.
#[derive(Clone, Debug, Default)]
pub struct OpLog(Rc<RefCell<Vec<HostOp>>>);

impl OpLog {
    pub fn snapshot(&self) -> Vec<HostOp> {
        self.0.borrow().clone()
    }

    pub fn take(&self) -> Vec<HostOp> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn mutations(&self) -> Vec<HostOp> {
        self.0
            .borrow()
            .iter()
            .filter(|op| op.is_mutation())
            .cloned()
            .collect()
    }

    fn push(&self, op: HostOp) {
        self.0.borrow_mut().push(op);
    }
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    next_id: u64,
    log: OpLog,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op_log(&self) -> OpLog {
        self.log.clone()
    }

    fn id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl HostConfig for MemoryHost {
    type Instance = MemNode;
    type Container = MemNode;

    fn create_instance(&mut self, ty: &str, props: &Props) -> MemNode {
        let id = self.id();
        self.log.push(HostOp::CreateInstance {
            id,
            tag: ty.to_string(),
        });
        MemNode::new(
            id,
            MemKind::Element {
                tag: ty.into(),
                attributes: props.attributes.clone(),
            },
        )
    }

    fn create_text_instance(&mut self, text: &str) -> MemNode {
        let id = self.id();
        self.log.push(HostOp::CreateText {
            id,
            text: text.to_string(),
        });
        MemNode::new(id, MemKind::Text(text.to_string()))
    }

    fn append_initial_child(&mut self, parent: &MemNode, child: &MemNode) {
        self.log.push(HostOp::AppendInitialChild {
            parent: parent.id(),
            child: child.id(),
        });
        parent.push(child);
    }

    fn append_child_to_container(&mut self, container: &MemNode, child: &MemNode) {
        self.append_child(container, child);
    }

    fn append_child(&mut self, parent: &MemNode, child: &MemNode) {
        self.log.push(HostOp::AppendChild {
            parent: parent.id(),
            child: child.id(),
        });
        parent.push(child);
    }

    fn insert_before(&mut self, parent: &MemNode, child: &MemNode, before: &MemNode) {
        self.log.push(HostOp::InsertBefore {
            parent: parent.id(),
            child: child.id(),
            before: before.id(),
        });
        parent.insert_before(child, before);
    }

    fn insert_in_container_before(&mut self, container: &MemNode, child: &MemNode, before: &MemNode) {
        self.insert_before(container, child, before);
    }

    fn remove_child(&mut self, parent: &MemNode, child: &MemNode) {
        self.log.push(HostOp::RemoveChild {
            parent: parent.id(),
            child: child.id(),
        });
        if !parent.detach(child) {
            log::warn!("remove_child: {child:?} is not a child of {parent:?}");
        }
    }

    fn remove_child_from_container(&mut self, container: &MemNode, child: &MemNode) {
        self.remove_child(container, child);
    }

    fn commit_update(&mut self, instance: &MemNode, _ty: &str, _old: &Props, new_props: &Props) {
        self.log.push(HostOp::CommitUpdate { id: instance.id() });
        if let MemKind::Element { attributes, .. } = &mut instance.0.borrow_mut().kind {
            *attributes = new_props.attributes.clone();
        }
    }

    fn commit_text_update(&mut self, instance: &MemNode, _old: &str, new_text: &str) {
        self.log.push(HostOp::CommitTextUpdate {
            id: instance.id(),
            text: new_text.to_string(),
        });
        if let MemKind::Text(text) = &mut instance.0.borrow_mut().kind {
            *text = new_text.to_string();
        }
    }
}
