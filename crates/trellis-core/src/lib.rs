//! # Fibers, Hooks, and Commits
//!
//! Trellis keeps a UI tree in sync with a host (a DOM, a scene graph, or the
//! in-memory [`MemoryHost`]) by rendering descriptions of what the tree should
//! look like and applying only the differences. There are three main pieces:
//!
//! - [`Node`] / [`Element`]: immutable descriptions built with [`h`] and [`text`].
//! - Function components and [`Hooks`]: positional state with `use_state`.
//! - A [`Root`]: owns the fiber tree and runs render cycles.
//!
//! ## Rendering
//!
//! ```rust
//! use trellis_core::*;
//!
//! let container = MemNode::container();
//! let root = create_container(MemoryHost::new(), container.clone());
//!
//! root.render(h("div").attr("id", "app").child("hello"));
//! assert_eq!(container.to_markup(), r#"<div id="app">hello</div>"#);
//! ```
//!
//! ## Components and state
//!
//! A component is any `Fn(&mut Hooks, &Props) -> RenderResult`. Dispatching a
//! state update schedules a new cycle on the owning root:
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
//!
//! let container = MemNode::container();
//! let root = create_container(MemoryHost::new(), container.clone());
//! root.render(Element::component(Counter));
//!
//! let button = container.find_by_tag("button").unwrap();
//! button.click();
//! button.click();
//! assert_eq!(container.text_content(), "Count = 2");
//! ```
//!
//! ## Cycles
//!
//! Each cycle builds a work-in-progress tree next to the committed one
//! (`current`), reusing fibers from the previous cycle. Host nodes are created
//! detached while rendering; inserts, moves, updates and removals happen in a
//! single commit step at the end. A cycle that fails (a component error, a
//! hook order violation, a panic) is dropped before that step, so the host
//! never sees a half-rendered tree. See [`RenderOutcome`].
//!
//! ## Reentrancy
//!
//! Everything is single-threaded. An update dispatched while the root is busy
//! (from inside a render, or inside [`Root::inspect`]) is deferred and runs as
//! soon as the root is free, up to [`RootOptions::nested_update_limit`] nested
//! cycles.

mod begin_work;
mod child_fiber;
mod commit;
mod complete_work;
pub mod element;
pub mod error;
pub mod fiber;
pub mod flags;
pub mod hooks;
pub mod host;
pub mod memory;
pub mod prelude;
pub mod root;
mod tests;
pub mod update_queue;
pub mod work_loop;

pub use element::*;
pub use error::*;
pub use fiber::{FiberArena, FiberId, FiberNode, MemoizedState, WorkTag};
pub use flags::Flags;
pub use hooks::*;
pub use host::HostConfig;
pub use memory::*;
pub use root::*;
pub use update_queue::{Action, QueueMode};
pub use work_loop::*;
