use crate::fiber::{FiberArena, FiberId, FiberKind, OffscreenMode};
use crate::flags::Flags;
use crate::host::{HostConfig, HostId};
use crate::work_loop::WorkContext;

pub(crate) fn complete_work(fibers: &mut FiberArena, wip: FiberId, cx: &WorkContext<'_>) {
    let kind = fibers[wip].kind.clone();
    let current = fibers[wip].alternate.filter(|id| fibers.contains(*id));
    log::trace!("complete {} {wip:?}", kind.name());

    match kind {
        FiberKind::HostComponent(ty) => match (current, fibers[wip].state_node) {
            (Some(current), Some(_)) => {
                let changed = match &fibers[current].memoized_props {
                    Some(old) => !old.same_attributes(&fibers[wip].pending_props),
                    None => true,
                };
                if changed {
                    fibers[wip].flags |= Flags::UPDATE;
                }
            }
            _ => {
                let instance = cx.host.create_instance(&ty, &fibers[wip].pending_props);
                append_all_children(fibers, cx.host, instance, wip);
                fibers[wip].state_node = Some(instance);
            }
        },
        FiberKind::HostText => {
            let content = fibers[wip]
                .pending_props
                .text_content()
                .unwrap_or_default()
                .to_string();
            match (current, fibers[wip].state_node) {
                (Some(current), Some(_)) => {
                    let old = fibers[current]
                        .memoized_props
                        .as_ref()
                        .and_then(|props| props.text_content());
                    if old != Some(content.as_str()) {
                        fibers[wip].flags |= Flags::UPDATE;
                    }
                }
                _ => {
                    let instance = cx.host.create_text_instance(&content);
                    fibers[wip].state_node = Some(instance);
                }
            }
        }
        FiberKind::ContextProvider(id) => cx.context.borrow_mut().pop(id),
        FiberKind::Offscreen => {
            let next_mode = OffscreenMode::of(&fibers[wip].pending_props);
            let previous_mode = current
                .and_then(|current| fibers[current].memoized_props.as_ref())
                .map(OffscreenMode::of);
            let changed = match previous_mode {
                Some(previous) => previous != next_mode,
                None => next_mode == OffscreenMode::Hidden,
            };
            if changed {
                fibers[wip].flags |= Flags::VISIBILITY;
            }
        }
        FiberKind::HostRoot
        | FiberKind::FunctionComponent(_)
        | FiberKind::Fragment
        | FiberKind::Suspense => {}
    }

    bubble_properties(fibers, wip);
}

/// Attaches the top-level host nodes under `wip` to the freshly created
/// `parent` instance.
fn append_all_children(
    fibers: &FiberArena,
    host: &dyn HostConfig,
    parent: HostId,
    wip: FiberId,
) {
    let Some(mut node) = fibers[wip].child else {
        return;
    };
    loop {
        let fiber = &fibers[node];
        if fiber.kind.is_host() {
            if let Some(instance) = fiber.state_node {
                host.append_initial_child(parent, instance);
            }
        } else if let Some(child) = fiber.child {
            node = child;
            continue;
        }
        loop {
            if let Some(sibling) = fibers[node].sibling {
                node = sibling;
                break;
            }
            match fibers[node].parent {
                Some(parent) if parent != wip => node = parent,
                _ => return,
            }
        }
    }
}

fn bubble_properties(fibers: &mut FiberArena, wip: FiberId) {
    let mut subtree = Flags::empty();
    let mut child = fibers[wip].child;
    while let Some(id) = child {
        let fiber = &mut fibers[id];
        subtree |= fiber.flags | fiber.subtree_flags;
        fiber.parent = Some(wip);
        child = fiber.sibling;
    }
    fibers[wip].subtree_flags |= subtree;
}
