use super::*;
use crate::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn drain(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

/// Logs `create`/`destroy` for an effect keyed on its `id` prop.
fn tracker(log: &Log) -> Component {
    let log = Rc::clone(log);
    Component::new("Tracker", move |props| {
        let name = props.str("name").unwrap_or("t").to_string();
        let id = props.int("id").unwrap_or(0);
        let log = Rc::clone(&log);
        let label = format!("{name}{id}");
        use_effect(Some(deps![id]), move |scope| {
            log.borrow_mut().push(format!("create {label}"));
            scope.on_cleanup(move || {
                log.borrow_mut().push(format!("destroy {label}"));
            })
        });
        h("span").child(id).into()
    })
}

#[test]
fn effects_run_after_commit_and_clean_up_on_change() {
    init_logger();
    let log = Log::default();
    let tracker = tracker(&log);
    let test = TestRoot::new();

    test.render(tracker.element().attr("id", 1));
    assert_eq!(drain(&log), vec!["create t1"]);

    test.render(tracker.element().attr("id", 1));
    assert!(drain(&log).is_empty());

    test.render(tracker.element().attr("id", 2));
    assert_eq!(drain(&log), vec!["destroy t1", "create t2"]);

    test.unmount();
    assert_eq!(drain(&log), vec!["destroy t2"]);
}

#[test]
fn every_cleanup_runs_before_any_create() {
    init_logger();
    let log = Log::default();
    let tracker = tracker(&log);
    let test = TestRoot::new();
    let view = |id: i64| {
        h("div")
            .child(tracker.element().attr("name", "a").attr("id", id))
            .child(tracker.element().attr("name", "b").attr("id", id))
    };

    test.render(view(1));
    assert_eq!(drain(&log), vec!["create a1", "create b1"]);

    test.render(view(2));
    assert_eq!(
        drain(&log),
        vec!["destroy a1", "destroy b1", "create a2", "create b2"]
    );
}

#[test]
fn effects_are_not_run_inside_the_commit() {
    init_logger();
    let log = Log::default();
    let tracker = tracker(&log);
    let test = TestRoot::new();

    test.root().render(tracker.element().attr("id", 1));
    test.flush_microtasks();
    assert_eq!(test.text(), "1");
    assert!(log.borrow().is_empty());
    assert!(test.scheduler().has_pending());

    test.flush();
    assert_eq!(drain(&log), vec!["create t1"]);
}

#[test]
fn effect_without_deps_runs_after_every_commit() {
    init_logger();
    let runs = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&runs);
    let always = Component::new("Always", move |_| {
        let counter = Rc::clone(&counter);
        use_effect(None, move |_| {
            *counter.borrow_mut() += 1;
            EffectResult::default()
        });
        Child::Empty
    });
    let test = TestRoot::new();
    for _ in 0..3 {
        test.render(always.element());
    }
    assert_eq!(*runs.borrow(), 3);
}

#[test]
fn state_set_in_an_effect_is_visible_after_the_next_pass() {
    init_logger();
    let loader = Component::new("Loader", |_| {
        let (value, set_value) = use_state(|| "loading".to_string());
        use_effect(Some(deps![]), move |_| {
            set_value.set("ready".to_string());
            EffectResult::default()
        });
        h("p").child(value).into()
    });
    let test = TestRoot::new();
    test.root().render(loader.element());
    test.flush_microtasks();
    assert_eq!(test.text(), "loading");

    test.flush();
    assert_eq!(test.text(), "ready");
}

#[test]
fn unmount_removes_each_top_level_node_once() {
    init_logger();
    let log = Log::default();
    let tracker = tracker(&log);
    let test = TestRoot::new();
    test.render(
        fragment()
            .child(h("header").child(h("b").child("title")))
            .child(tracker.element().attr("id", 7))
            .child(h("footer")),
    );
    drain(&log);
    let top = test.top_level();
    assert_eq!(top.len(), 3);
    let header = top[0];
    let inner = test.host().children_of(header)[0];

    test.unmount();
    assert!(test.top_level().is_empty());
    for node in &top {
        assert_eq!(test.host().removal_count(*node), 1);
    }
    assert_eq!(test.host().removal_count(inner), 0);
    assert_eq!(drain(&log), vec!["destroy t7"]);
}

#[test]
fn removed_subtree_cleans_up_nested_effects() {
    init_logger();
    let log = Log::default();
    let tracker = tracker(&log);
    let wrapper = {
        let tracker = tracker.clone();
        Component::new("Wrapper", move |_| {
            h("section")
                .child(tracker.element().attr("name", "inner").attr("id", 1))
                .into()
        })
    };
    let test = TestRoot::new();
    test.render(h("main").child(wrapper.element()));
    assert_eq!(drain(&log), vec!["create inner1"]);

    test.render(h("main"));
    assert_eq!(drain(&log), vec!["destroy inner1"]);
    let main = test.host().find(test.container(), "main").expect("main");
    assert!(test.host().children_of(main).is_empty());
}
