//! In-memory host used by tests and examples.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::rc::Rc;

use fibra_core::props::Attributes;
use fibra_core::{
    apply_style_patches, diff_props, HostConfig, HostId, Microtask, PropPatch, PropValue, Props,
    StyleMap,
};

#[derive(Clone, Debug)]
pub enum NodeData {
    Container,
    Element { ty: String, attrs: Attributes },
    Text(String),
}

#[derive(Clone, Debug)]
struct HostNode {
    data: NodeData,
    children: Vec<HostId>,
    parent: Option<HostId>,
    hidden: bool,
}

impl HostNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            children: Vec::new(),
            parent: None,
            hidden: false,
        }
    }
}

/// Every call the engine made, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    CreateInstance { id: HostId, ty: String },
    CreateText { id: HostId, content: String },
    AppendInitial { parent: HostId, child: HostId },
    Append { parent: HostId, child: HostId },
    Insert { parent: HostId, child: HostId, before: HostId },
    Remove { parent: HostId, child: HostId },
    Update { id: HostId, patches: usize },
    TextUpdate { id: HostId, content: String },
    Hide(HostId),
    Unhide(HostId),
}

/// Host whose nodes live in a vector. Handles are indices and are never
/// reused, so a removed node can still be inspected.
#[derive(Default)]
pub struct MemoryHost {
    nodes: RefCell<Vec<HostNode>>,
    ops: RefCell<Vec<HostOp>>,
    microtasks: RefCell<VecDeque<Microtask>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_container(&self) -> HostId {
        self.push_node(NodeData::Container)
    }

    fn push_node(&self, data: NodeData) -> HostId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(HostNode::new(data));
        nodes.len() - 1
    }

    fn record(&self, op: HostOp) {
        self.ops.borrow_mut().push(op);
    }

    /// Runs queued microtasks, including ones queued while running, and
    /// returns how many ran.
    pub fn run_microtasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.microtasks.borrow_mut().pop_front();
            let Some(task) = task else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    pub fn has_microtasks(&self) -> bool {
        !self.microtasks.borrow().is_empty()
    }

    pub fn ops(&self) -> Vec<HostOp> {
        self.ops.borrow().clone()
    }

    pub fn take_ops(&self) -> Vec<HostOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    /// How many times `child` was removed from a parent.
    pub fn removal_count(&self, child: HostId) -> usize {
        self.ops
            .borrow()
            .iter()
            .filter(|op| matches!(op, HostOp::Remove { child: removed, .. } if *removed == child))
            .count()
    }

    pub fn children_of(&self, id: HostId) -> Vec<HostId> {
        self.nodes
            .borrow()
            .get(id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent_of(&self, id: HostId) -> Option<HostId> {
        self.nodes.borrow().get(id).and_then(|node| node.parent)
    }

    pub fn node_type(&self, id: HostId) -> Option<String> {
        match &self.nodes.borrow().get(id)?.data {
            NodeData::Element { ty, .. } => Some(ty.clone()),
            NodeData::Text(_) => Some("#text".to_string()),
            NodeData::Container => Some("#container".to_string()),
        }
    }

    pub fn attr(&self, id: HostId, name: &str) -> Option<PropValue> {
        match &self.nodes.borrow().get(id)?.data {
            NodeData::Element { attrs, .. } => attrs.get(name).cloned(),
            _ => None,
        }
    }

    /// One entry of an element's `style` map.
    pub fn style(&self, id: HostId, name: &str) -> Option<String> {
        match self.attr(id, "style")? {
            PropValue::Style(style) => style.get(name).map(|value| value.to_string()),
            _ => None,
        }
    }

    pub fn text_of(&self, id: HostId) -> Option<String> {
        match &self.nodes.borrow().get(id)?.data {
            NodeData::Text(content) => Some(content.clone()),
            _ => None,
        }
    }

    /// Concatenated text of the subtree at `id`, hidden nodes included.
    pub fn text_content(&self, id: HostId) -> String {
        let nodes = self.nodes.borrow();
        let mut output = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = nodes.get(current) else {
                continue;
            };
            if let NodeData::Text(content) = &node.data {
                output.push_str(content);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        output
    }

    pub fn is_hidden(&self, id: HostId) -> bool {
        self.nodes.borrow().get(id).is_some_and(|node| node.hidden)
    }

    /// First element of type `ty` in the subtree at `root`, depth first.
    pub fn find(&self, root: HostId, ty: &str) -> Option<HostId> {
        let nodes = self.nodes.borrow();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            let node = nodes.get(current)?;
            if matches!(&node.data, NodeData::Element { ty: node_ty, .. } if node_ty == ty) {
                return Some(current);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Calls the handler stored under `name` on `id`. Returns whether one
    /// was found. The node store is not borrowed while it runs.
    pub fn invoke_handler(&self, id: HostId, name: &str) -> bool {
        match self.attr(id, name) {
            Some(PropValue::Handler(handler)) => {
                handler.call();
                true
            }
            _ => false,
        }
    }

    /// Renders the subtree at `root` one node per line, e.g.
    /// `<li key="a">` or `"text"`.
    pub fn dump_tree(&self, root: HostId) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, root, 0);
        output
    }

    fn dump_node(&self, output: &mut String, id: HostId, depth: usize) {
        let indent = "  ".repeat(depth);
        let children = {
            let nodes = self.nodes.borrow();
            let Some(node) = nodes.get(id) else {
                let _ = writeln!(output, "{indent}[{id}] (missing)");
                return;
            };
            let hidden = if node.hidden { " hidden" } else { "" };
            match &node.data {
                NodeData::Container => {
                    let _ = writeln!(output, "{indent}#container");
                }
                NodeData::Text(content) => {
                    let _ = writeln!(output, "{indent}{content:?}{hidden}");
                }
                NodeData::Element { ty, attrs } => {
                    let _ = write!(output, "{indent}<{ty}");
                    for (name, value) in attrs {
                        if !matches!(value, PropValue::Handler(_)) {
                            let _ = write!(output, " {name}={value:?}");
                        }
                    }
                    let _ = writeln!(output, ">{hidden}");
                }
            }
            node.children.clone()
        };
        for child in children {
            self.dump_node(output, child, depth + 1);
        }
    }

    fn detach(nodes: &mut [HostNode], child: HostId) {
        let Some(parent) = nodes.get(child).and_then(|node| node.parent) else {
            return;
        };
        if let Some(parent) = nodes.get_mut(parent) {
            parent.children.retain(|id| *id != child);
        }
        if let Some(node) = nodes.get_mut(child) {
            node.parent = None;
        }
    }

    fn attach(&self, parent: HostId, child: HostId, before: Option<HostId>) {
        let mut nodes = self.nodes.borrow_mut();
        if parent >= nodes.len() || child >= nodes.len() {
            log::warn!("attach of {child} to unknown parent {parent}");
            return;
        }
        Self::detach(&mut nodes, child);
        let siblings = &mut nodes[parent].children;
        let position = before.and_then(|before| siblings.iter().position(|id| *id == before));
        match (before, position) {
            (_, Some(position)) => siblings.insert(position, child),
            (Some(before), None) => {
                log::warn!("insert before {before}, which is not a child of {parent}; appending");
                siblings.push(child);
            }
            (None, None) => siblings.push(child),
        }
        nodes[child].parent = Some(parent);
    }

    fn set_hidden(&self, id: HostId, hidden: bool) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(id) {
            node.hidden = hidden;
        }
    }
}

fn apply_patches(attrs: &mut Attributes, patches: Vec<PropPatch>) {
    for patch in patches {
        match patch {
            PropPatch::Set(name, value) => {
                attrs.insert(name, value);
            }
            PropPatch::Remove(name) => {
                attrs.remove(&name);
            }
            PropPatch::Style { name, patches } => {
                let mut style: StyleMap = match attrs.get(&name) {
                    Some(PropValue::Style(existing)) => (**existing).clone(),
                    _ => StyleMap::new(),
                };
                apply_style_patches(&mut style, &patches);
                attrs.insert(name, PropValue::Style(Rc::new(style)));
            }
        }
    }
}

impl HostConfig for MemoryHost {
    fn create_instance(&self, ty: &str, props: &Props) -> HostId {
        let id = self.push_node(NodeData::Element {
            ty: ty.to_string(),
            attrs: props.attrs().clone(),
        });
        self.record(HostOp::CreateInstance {
            id,
            ty: ty.to_string(),
        });
        id
    }

    fn create_text_instance(&self, content: &str) -> HostId {
        let id = self.push_node(NodeData::Text(content.to_string()));
        self.record(HostOp::CreateText {
            id,
            content: content.to_string(),
        });
        id
    }

    fn append_initial_child(&self, parent: HostId, child: HostId) {
        self.attach(parent, child, None);
        self.record(HostOp::AppendInitial { parent, child });
    }

    fn append_child_to_container(&self, container: HostId, child: HostId) {
        self.attach(container, child, None);
        self.record(HostOp::Append {
            parent: container,
            child,
        });
    }

    fn insert_child_to_container(&self, container: HostId, child: HostId, before: HostId) {
        self.attach(container, child, Some(before));
        self.record(HostOp::Insert {
            parent: container,
            child,
            before,
        });
    }

    fn remove_child(&self, parent: HostId, child: HostId) {
        {
            let mut nodes = self.nodes.borrow_mut();
            if nodes.get(child).and_then(|node| node.parent) != Some(parent) {
                log::warn!("remove of {child}, which is not a child of {parent}");
            }
            Self::detach(&mut nodes, child);
        }
        self.record(HostOp::Remove { parent, child });
    }

    fn commit_update(&self, instance: HostId, _ty: &str, old: &Props, new: &Props) {
        let patches = diff_props(old, new);
        let count = patches.len();
        if let Some(HostNode {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.nodes.borrow_mut().get_mut(instance)
        {
            apply_patches(attrs, patches);
        }
        self.record(HostOp::Update {
            id: instance,
            patches: count,
        });
    }

    fn commit_text_update(&self, instance: HostId, _old: &str, new: &str) {
        if let Some(HostNode {
            data: NodeData::Text(content),
            ..
        }) = self.nodes.borrow_mut().get_mut(instance)
        {
            *content = new.to_string();
        }
        self.record(HostOp::TextUpdate {
            id: instance,
            content: new.to_string(),
        });
    }

    fn hide_instance(&self, instance: HostId) {
        self.set_hidden(instance, true);
        self.record(HostOp::Hide(instance));
    }

    fn unhide_instance(&self, instance: HostId) {
        self.set_hidden(instance, false);
        self.record(HostOp::Unhide(instance));
    }

    fn schedule_microtask(&self, task: Microtask) {
        self.microtasks.borrow_mut().push_back(task);
    }
}
