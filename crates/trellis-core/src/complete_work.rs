use crate::fiber::{FiberArena, FiberId, WorkTag};
use crate::flags::Flags;
use crate::host::HostConfig;

/// Builds or diffs the host side of `wip` once all of its children are
/// complete. New instances stay detached until commit.
pub(crate) fn complete_work<H: HostConfig>(
    fibers: &mut FiberArena<H::Instance>,
    host: &mut H,
    wip: FiberId,
) {
    log::trace!("complete_work {}", fibers[wip].describe());
    let current = fibers[wip].alternate.filter(|id| fibers.contains(*id));

    match fibers[wip].tag {
        WorkTag::HostComponent => match current {
            Some(current) if fibers[wip].state_node.is_some() => {
                let changed = match &fibers[current].memoized_props {
                    Some(old) => !old.same_attributes(&fibers[wip].pending_props),
                    None => true,
                };
                if changed {
                    fibers[wip].flags |= Flags::UPDATE;
                }
            }
            _ => {
                let props = fibers[wip].pending_props.clone();
                let ty = fibers[wip]
                    .element_type
                    .as_ref()
                    .map(|t| t.name().to_string())
                    .unwrap_or_default();
                let instance = host.create_instance(&ty, &props);
                append_all_children(fibers, host, &instance, wip);
                fibers[wip].state_node = Some(instance);
            }
        },
        WorkTag::HostText => {
            let new_text = fibers[wip]
                .pending_props
                .text_content()
                .cloned()
                .unwrap_or_default();
            match current {
                Some(current) if fibers[wip].state_node.is_some() => {
                    let old_text = fibers[current]
                        .memoized_props
                        .as_ref()
                        .and_then(|p| p.text_content().cloned());
                    if old_text.as_deref() != Some(&*new_text) {
                        fibers[wip].flags |= Flags::UPDATE;
                    }
                }
                _ => {
                    let instance = host.create_text_instance(&new_text);
                    fibers[wip].state_node = Some(instance);
                }
            }
        }
        WorkTag::HostRoot | WorkTag::FunctionComponent => {}
    }

    bubble_properties(fibers, wip);
}

/// Appends the top-level host nodes below `wip` to `parent`, looking through
/// function components.
fn append_all_children<H: HostConfig>(
    fibers: &FiberArena<H::Instance>,
    host: &mut H,
    parent: &H::Instance,
    wip: FiberId,
) {
    let mut node = fibers[wip].child;
    while let Some(id) = node {
        let fiber = &fibers[id];
        if fiber.tag.is_host() {
            if let Some(instance) = &fiber.state_node {
                host.append_initial_child(parent, instance);
            }
        } else if let Some(child) = fiber.child {
            node = Some(child);
            continue;
        }

        // next sibling, climbing back up through function components
        let mut cursor = id;
        node = loop {
            if let Some(sibling) = fibers[cursor].sibling {
                break Some(sibling);
            }
            match fibers[cursor].return_fiber {
                Some(parent_fiber) if parent_fiber != wip => cursor = parent_fiber,
                _ => break None,
            }
        };
    }
}

fn bubble_properties<I: Clone>(fibers: &mut FiberArena<I>, wip: FiberId) {
    let mut subtree_flags = Flags::NONE;
    let mut child = fibers[wip].child;
    while let Some(id) = child {
        let fiber = &mut fibers[id];
        subtree_flags |= fiber.subtree_flags | fiber.flags;
        fiber.return_fiber = Some(wip);
        child = fiber.sibling;
    }
    fibers[wip].subtree_flags |= subtree_flags;
}
