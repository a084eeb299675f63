use super::*;
use crate::prelude::*;
use fibra_core::HostId;
use std::cell::RefCell;
use std::rc::Rc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn object_ref_points_at_the_committed_node() {
    init_logger();
    let (input_ref, cell) = HostRef::object();
    let test = TestRoot::new();
    test.render(h("form").child(h("input").host_ref(input_ref.clone())));

    let input = test.host().find(test.container(), "input");
    assert!(input.is_some());
    assert_eq!(cell.get(), input);

    test.render(h("form").child(h("input").host_ref(input_ref.clone())));
    assert_eq!(cell.get(), input);

    test.unmount();
    assert_eq!(cell.get(), None);
}

#[test]
fn callback_refs_detach_the_old_before_attaching_the_new() {
    init_logger();
    let calls: Rc<RefCell<Vec<(&'static str, Option<HostId>)>>> = Rc::default();
    let make = |name: &'static str| {
        let calls = Rc::clone(&calls);
        HostRef::callback(move |node| {
            calls.borrow_mut().push((name, node));
        })
    };
    let (first, second) = (make("first"), make("second"));
    let test = TestRoot::new();

    test.render(h("canvas").host_ref(first.clone()));
    let canvas = test.host().find(test.container(), "canvas");
    test.render(h("canvas").host_ref(first.clone()));
    assert_eq!(*calls.borrow(), vec![("first", canvas)]);

    test.render(h("canvas").host_ref(second.clone()));
    assert_eq!(
        *calls.borrow(),
        vec![("first", canvas), ("first", None), ("second", canvas)]
    );
}

#[test]
fn refs_see_the_node_already_in_its_parent() {
    init_logger();
    let test = Rc::new(TestRoot::new());
    let parent_seen = Rc::new(RefCell::new(None));
    let (probe, seen) = (Rc::downgrade(&test), Rc::clone(&parent_seen));
    let child_ref = HostRef::callback(move |node| {
        if let (Some(node), Some(test)) = (node, probe.upgrade()) {
            *seen.borrow_mut() = test.host().parent_of(node);
        }
    });
    test.render(h("section").child(h("p").host_ref(child_ref)));

    let section = test.host().find(test.container(), "section");
    assert!(section.is_some());
    assert_eq!(*parent_seen.borrow(), section);
}

#[test]
fn moved_fiber_keeps_its_ref() {
    init_logger();
    let (item_ref, cell) = HostRef::object();
    let view = |order: &[&str]| -> Child {
        h("ol")
            .children(order.iter().map(|key| {
                let item = h("li").key(key).child(*key);
                if *key == "b" {
                    item.host_ref(item_ref.clone())
                } else {
                    item
                }
            }))
            .into()
    };
    let test = TestRoot::new();
    test.render(view(&["a", "b", "c"]));
    let b = cell.get();
    assert!(b.is_some());

    test.render(view(&["b", "c", "a"]));
    assert_eq!(cell.get(), b);
    let ol = test.host().find(test.container(), "ol").expect("ol");
    assert_eq!(test.host().children_of(ol).first().copied(), b);
}

#[test]
fn fiber_arena_is_swept_after_commits() {
    init_logger();
    let test = TestRoot::new();
    test.render(h("ul").children((0..20).map(|n| h("li").key(n))));
    let full = test.root().fiber_count();

    test.render(h("ul"));
    test.render(h("ul"));
    assert!(test.root().fiber_count() < full);
    assert!(test.root().debug_tree().contains("ul"));
}
