use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::RenderResult;
use crate::hooks::Hooks;

pub type Key = Rc<str>;
pub type Ref = Rc<dyn Any>;
pub type Callback = Rc<dyn Fn()>;

/// A rendered function. Implemented for every `Fn(&mut Hooks, &Props) -> RenderResult`.
pub trait Component: 'static {
    fn render(&self, hooks: &mut Hooks<'_>, props: &Props) -> RenderResult;
}

impl<F> Component for F
where
    F: Fn(&mut Hooks<'_>, &Props) -> RenderResult + 'static,
{
    fn render(&self, hooks: &mut Hooks<'_>, props: &Props) -> RenderResult {
        self(hooks, props)
    }
}

/// Function reference stored in a fiber's `type`. Two component types are the
/// same component when they wrap the same Rust type.
#[derive(Clone)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
    render: Rc<dyn Component>,
}

impl ComponentType {
    pub fn new<C: Component>(component: C) -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: short_type_name(std::any::type_name::<C>()),
            render: Rc::new(component),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn render(&self, hooks: &mut Hooks<'_>, props: &Props) -> RenderResult {
        self.render.render(hooks, props)
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    // closures render as `path::to::fn::{{closure}}`; keep the enclosing fn
    let trimmed = full.trim_end_matches("::{{closure}}");
    trimmed.rsplit("::").next().unwrap_or(trimmed)
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementType {
    /// Native element, e.g. `div`.
    Host(Rc<str>),
    Function(ComponentType),
}

impl ElementType {
    pub fn name(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag,
            ElementType::Function(c) => c.name(),
        }
    }
}

#[derive(Clone)]
pub enum PropValue {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Callback(Callback),
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Callback(a), PropValue::Callback(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => write!(f, "{s:?}"),
            PropValue::Int(i) => write!(f, "{i}"),
            PropValue::Float(x) => write!(f, "{x}"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Callback(_) => write!(f, "<callback>"),
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => f.write_str(s),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Str(s.into())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Str(s.into())
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Int(v.into())
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Float(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

/// Property set of an element. `children` is either a single node or a
/// `Node::List`.
#[derive(Clone, Debug, Default)]
pub struct Props {
    pub attributes: BTreeMap<Rc<str>, PropValue>,
    pub children: Node,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Props of a host text fiber.
    pub fn text(content: Rc<str>) -> Self {
        Self {
            attributes: BTreeMap::new(),
            children: Node::Text(content),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn callback(&self, name: &str) -> Option<Callback> {
        match self.get(name)? {
            PropValue::Callback(cb) => Some(cb.clone()),
            _ => None,
        }
    }

    pub fn text_content(&self) -> Option<&Rc<str>> {
        match &self.children {
            Node::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Attribute equality, children excluded (they are diffed as fibers).
    pub fn same_attributes(&self, other: &Props) -> bool {
        self.attributes == other.attributes
    }
}

/// Immutable description of one element.
#[derive(Clone, Debug)]
pub struct Element {
    pub element_type: ElementType,
    pub key: Option<Key>,
    pub ref_handle: Option<Ref>,
    pub props: Rc<Props>,
}

impl Element {
    pub fn host(tag: impl Into<Rc<str>>) -> Self {
        Self::new(ElementType::Host(tag.into()))
    }

    pub fn component<F>(render: F) -> Self
    where
        F: Fn(&mut Hooks<'_>, &Props) -> RenderResult + 'static,
    {
        Self::from_component(render)
    }

    pub fn from_component<C: Component>(component: C) -> Self {
        Self::new(ElementType::Function(ComponentType::new(component)))
    }

    pub fn new(element_type: ElementType) -> Self {
        Element {
            element_type,
            key: None,
            ref_handle: None,
            props: Rc::new(Props::default()),
        }
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_ref(mut self, r: Ref) -> Self {
        self.ref_handle = Some(r);
        self
    }

    pub fn attr(mut self, name: impl Into<Rc<str>>, value: impl Into<PropValue>) -> Self {
        Rc::make_mut(&mut self.props)
            .attributes
            .insert(name.into(), value.into());
        self
    }

    pub fn on(self, event: &str, f: impl Fn() + 'static) -> Self {
        self.attr(event, PropValue::Callback(Rc::new(f)))
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        Rc::make_mut(&mut self.props).children = child.into();
        self
    }

    pub fn with_children(mut self, kids: impl IntoIterator<Item = Node>) -> Self {
        Rc::make_mut(&mut self.props).children = Node::list(kids);
        self
    }
}

/// What the root holds as state and what a component returns.
#[derive(Clone, Debug, Default)]
pub enum Node {
    #[default]
    Empty,
    Text(Rc<str>),
    Element(Element),
    List(Rc<[Node]>),
}

impl Node {
    pub fn text(s: impl Into<Rc<str>>) -> Self {
        Node::Text(s.into())
    }

    pub fn list(items: impl IntoIterator<Item = Node>) -> Self {
        Node::List(items.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }
}

impl From<Element> for Node {
    fn from(e: Element) -> Self {
        Node::Element(e)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.into())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(s.into())
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Node::Text(v.to_string().into())
    }
}

impl From<i32> for Node {
    fn from(v: i32) -> Self {
        Node::Text(v.to_string().into())
    }
}

impl From<Vec<Node>> for Node {
    fn from(v: Vec<Node>) -> Self {
        Node::List(v.into())
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(v: Option<T>) -> Self {
        v.map_or(Node::Empty, Into::into)
    }
}

/// Shorthand for `Element::host(tag)`.
pub fn h(tag: &str) -> Element {
    Element::host(tag)
}

/// Shorthand for a text node.
pub fn text(s: impl Into<Rc<str>>) -> Node {
    Node::text(s)
}
