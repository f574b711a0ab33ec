use std::fmt::Debug;

use crate::element::Props;

/// Operations the engine needs from a rendering target.
///
/// Handles are opaque to the engine: it stores them as `state_node` and hands
/// them back. The creation methods and `append_initial_child` run during the
/// complete phase on detached nodes; everything that touches an attached tree
/// runs in the commit phase.
pub trait HostConfig: 'static {
    type Instance: Clone + Debug;
    type Container: Clone + Debug;

    fn create_instance(&mut self, ty: &str, props: &Props) -> Self::Instance;
    fn create_text_instance(&mut self, text: &str) -> Self::Instance;
    fn append_initial_child(&mut self, parent: &Self::Instance, child: &Self::Instance);
    fn append_child_to_container(&mut self, container: &Self::Container, child: &Self::Instance);

    fn append_child(&mut self, parent: &Self::Instance, child: &Self::Instance);
    fn insert_before(
        &mut self,
        parent: &Self::Instance,
        child: &Self::Instance,
        before: &Self::Instance,
    );
    fn insert_in_container_before(
        &mut self,
        container: &Self::Container,
        child: &Self::Instance,
        before: &Self::Instance,
    );
    fn remove_child(&mut self, parent: &Self::Instance, child: &Self::Instance);
    fn remove_child_from_container(&mut self, container: &Self::Container, child: &Self::Instance);

    fn commit_update(
        &mut self,
        instance: &Self::Instance,
        ty: &str,
        old_props: &Props,
        new_props: &Props,
    );
    fn commit_text_update(&mut self, instance: &Self::Instance, old_text: &str, new_text: &str);
}

/// Nearest host ancestor of a fiber: a host instance or the root container.
pub(crate) enum HostParent<H: HostConfig> {
    Instance(H::Instance),
    Container(H::Container),
}

impl<H: HostConfig> HostParent<H> {
    pub(crate) fn append(&self, host: &mut H, child: &H::Instance) {
        match self {
            HostParent::Instance(parent) => host.append_child(parent, child),
            HostParent::Container(container) => host.append_child_to_container(container, child),
        }
    }

    pub(crate) fn insert_before(&self, host: &mut H, child: &H::Instance, before: &H::Instance) {
        match self {
            HostParent::Instance(parent) => host.insert_before(parent, child, before),
            HostParent::Container(container) => {
                host.insert_in_container_before(container, child, before)
            }
        }
    }

    pub(crate) fn remove(&self, host: &mut H, child: &H::Instance) {
        match self {
            HostParent::Instance(parent) => host.remove_child(parent, child),
            HostParent::Container(container) => host.remove_child_from_container(container, child),
        }
    }
}
