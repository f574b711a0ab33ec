pub use crate::element::{Element, Node, PropValue, Props, h, text};
pub use crate::error::{HookError, RenderError, RenderResult};
pub use crate::hooks::{Dispatch, Hooks, ReducerDispatch};
pub use crate::host::HostConfig;
pub use crate::memory::{MemNode, MemoryHost};
pub use crate::root::{Root, RootOptions, create_container, create_container_with, update_container};
pub use crate::update_queue::{Action, QueueMode};
pub use crate::work_loop::RenderOutcome;
