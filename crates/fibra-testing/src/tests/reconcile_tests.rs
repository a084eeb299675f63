use super::*;
use crate::prelude::*;
use fibra_core::{HostConfig, PropValue};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn list(keys: &[&str]) -> Child {
    h("ul")
        .children(keys.iter().map(|key| h("li").key(key).child(*key)))
        .into()
}

#[test]
fn keyed_reorder_moves_existing_host_nodes() {
    init_logger();
    let test = TestRoot::new();
    test.render(list(&["a", "b", "c"]));
    let ul = test.host().find(test.container(), "ul").expect("ul mounted");
    let before = test.host().children_of(ul);
    assert_eq!(test.text(), "abc");
    test.host().take_ops();

    test.render(list(&["c", "a", "b"]));
    assert_eq!(test.text(), "cab");
    assert_eq!(
        test.host().children_of(ul),
        vec![before[2], before[0], before[1]]
    );
    let ops = test.host().take_ops();
    assert!(!ops
        .iter()
        .any(|op| matches!(op, HostOp::CreateInstance { .. } | HostOp::Remove { .. })));
}

#[test]
fn inserted_item_goes_before_its_stable_sibling() {
    init_logger();
    let test = TestRoot::new();
    test.render(list(&["a", "c"]));
    let ul = test.host().find(test.container(), "ul").expect("ul mounted");
    let c = test.host().children_of(ul)[1];
    test.host().take_ops();

    test.render(list(&["a", "b", "c"]));
    assert_eq!(test.text(), "abc");
    let inserted = test.host().children_of(ul)[1];
    assert!(test.host().ops().contains(&HostOp::Insert {
        parent: ul,
        child: inserted,
        before: c,
    }));
}

#[test]
fn removed_items_leave_the_host_once() {
    init_logger();
    let test = TestRoot::new();
    test.render(list(&["a", "b", "c", "d"]));
    let ul = test.host().find(test.container(), "ul").expect("ul mounted");
    let old = test.host().children_of(ul);

    test.render(list(&["d", "b"]));
    assert_eq!(test.text(), "db");
    assert_eq!(test.host().removal_count(old[0]), 1);
    assert_eq!(test.host().removal_count(old[2]), 1);
    assert_eq!(test.host().removal_count(old[1]), 0);
    assert_eq!(test.host().parent_of(old[0]), None);
}

#[test]
fn text_change_updates_the_same_node() {
    init_logger();
    let test = TestRoot::new();
    test.render(h("p").child("one"));
    let p = test.host().find(test.container(), "p").expect("p mounted");
    let text_node = test.host().children_of(p)[0];

    test.render(h("p").child("two"));
    assert_eq!(test.host().children_of(p), vec![text_node]);
    assert_eq!(test.host().text_of(text_node).as_deref(), Some("two"));
    assert!(test.host().ops().contains(&HostOp::TextUpdate {
        id: text_node,
        content: "two".to_string(),
    }));
}

#[test]
fn style_entries_are_patched_in_place() {
    init_logger();
    let test = TestRoot::new();
    test.render(h("div").style("color", "red").style("margin", "0"));
    let div = test.host().find(test.container(), "div").expect("div mounted");

    test.render(h("div").style("color", "blue"));
    assert_eq!(test.host().style(div, "color").as_deref(), Some("blue"));
    assert_eq!(test.host().style(div, "margin"), None);
    assert!(test
        .host()
        .ops()
        .contains(&HostOp::Update { id: div, patches: 1 }));
}

#[test]
fn changing_the_element_type_replaces_the_node() {
    init_logger();
    let test = TestRoot::new();
    test.render(h("div").child("x"));
    let div = test.host().find(test.container(), "div").expect("div mounted");

    test.render(h("span").child("x"));
    let span = test.host().find(test.container(), "span").expect("span mounted");
    assert_ne!(div, span);
    assert_eq!(test.host().removal_count(div), 1);
    assert_eq!(test.top_level(), vec![span]);
}

#[test]
fn component_props_flow_into_host_nodes() {
    init_logger();
    let greeting = Component::new("Greeting", |props| {
        let name = props.str("name").unwrap_or("nobody").to_string();
        h("p").attr("title", name.as_str()).child(name).into()
    });
    let test = TestRoot::new();
    test.render(greeting.element().attr("name", "Ada"));
    let p = test.host().find(test.container(), "p").expect("p mounted");
    assert_eq!(test.text(), "Ada");

    test.render(greeting.element().attr("name", "Grace"));
    assert_eq!(test.text(), "Grace");
    assert_eq!(test.host().find(test.container(), "p"), Some(p));
    assert_eq!(
        test.host().attr(p, "title"),
        Some(PropValue::from("Grace"))
    );
}

#[test]
fn fragments_and_arrays_flatten_into_the_parent() {
    init_logger();
    let test = TestRoot::new();
    test.render(
        h("div")
            .child(fragment().child(h("a")).child(h("b")))
            .child(Child::array(vec![text("x"), text("y")])),
    );
    let div = test.host().find(test.container(), "div").expect("div mounted");
    let kinds: Vec<_> = test
        .host()
        .children_of(div)
        .into_iter()
        .filter_map(|id| test.host().node_type(id))
        .collect();
    assert_eq!(kinds, vec!["a", "b", "#text", "#text"]);
    assert_eq!(test.text(), "xy");
}

#[test]
fn dump_lists_the_host_tree() {
    init_logger();
    let test = TestRoot::new();
    test.render(h("ul").child(h("li").attr("id", "first").child("hi")));
    let expected = "#container\n  <ul>\n    <li id=\"first\">\n      \"hi\"\n";
    assert_eq!(test.dump(), expected);
}

#[test]
fn memory_host_keeps_removed_nodes_inspectable() {
    let host = MemoryHost::new();
    let container = host.create_container();
    let node = host.create_text_instance("gone");
    host.append_child_to_container(container, node);
    host.remove_child(container, node);
    assert!(host.children_of(container).is_empty());
    assert_eq!(host.text_of(node).as_deref(), Some("gone"));
    assert_eq!(host.removal_count(node), 1);
    assert!(matches!(host.node_type(container).as_deref(), Some("#container")));
}
