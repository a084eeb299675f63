use super::*;
use crate::prelude::*;
use fibra_core::scheduler::run_with_priority;
use fibra_core::{RootOptions, SetState, StartTransition};
use std::cell::RefCell;
use std::rc::Rc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

type Slot<T> = Rc<RefCell<Option<T>>>;

/// Component showing two counters, exposing both setters.
fn pair(a_slot: &Slot<SetState<i32>>, b_slot: &Slot<SetState<i32>>) -> Component {
    let (a_slot, b_slot) = (Rc::clone(a_slot), Rc::clone(b_slot));
    Component::new("Pair", move |_| {
        let (a, set_a) = use_state(|| 0);
        let (b, set_b) = use_state(|| 0);
        *a_slot.borrow_mut() = Some(set_a);
        *b_slot.borrow_mut() = Some(set_b);
        // enough fibers for a render to span several slices
        let padding = (0..6).map(|n| h("i").key(n));
        h("div")
            .child(format!("a{a} b{b}"))
            .children(padding)
            .into()
    })
}

fn setter(slot: &Slot<SetState<i32>>) -> SetState<i32> {
    slot.borrow().clone().expect("component rendered")
}

#[test]
fn same_lane_updates_share_one_task() {
    init_logger();
    let (a_slot, b_slot) = (Slot::default(), Slot::default());
    let test = TestRoot::new();
    test.render(pair(&a_slot, &b_slot).element());
    let scheduled = test.scheduler().scheduled_total();

    let (set_a, set_b) = (setter(&a_slot), setter(&b_slot));
    set_a.set(1);
    set_b.set(1);
    set_a.update(|a| a + 1);
    assert_eq!(test.scheduler().scheduled_total(), scheduled + 1);
    assert_eq!(test.root().pending_lanes(), Lanes::DEFAULT);

    test.flush();
    assert_eq!(test.text(), "a2 b1");
    assert!(test.root().pending_lanes().is_empty());
}

#[test]
fn sync_updates_flush_in_a_microtask() {
    init_logger();
    let (a_slot, b_slot) = (Slot::default(), Slot::default());
    let test = TestRoot::new();
    test.render(pair(&a_slot, &b_slot).element());
    let scheduled = test.scheduler().scheduled_total();

    let set_a = setter(&a_slot);
    run_with_priority(test.scheduler(), SchedulerPriority::Immediate, || {
        set_a.set(5);
        set_a.set(6);
    });
    assert_eq!(test.root().pending_lanes(), Lanes::SYNC);
    assert_eq!(test.scheduler().scheduled_total(), scheduled);

    assert_eq!(test.flush_microtasks(), 1);
    assert_eq!(test.text(), "a6 b0");
    assert!(!test.scheduler().has_pending());
}

#[test]
fn urgent_update_interrupts_a_time_sliced_render() {
    init_logger();
    let (a_slot, b_slot) = (Slot::default(), Slot::default());
    let test = TestRoot::new();
    test.render(pair(&a_slot, &b_slot).element());
    test.scheduler().set_yield_after(Some(0));

    setter(&a_slot).set(1);
    // root, then the component itself
    assert!(test.scheduler().run_next());
    assert!(test.scheduler().run_next());
    assert_eq!(test.text(), "a0 b0");
    assert_eq!(test.scheduler().pending_count(), 1);

    let set_b = setter(&b_slot);
    run_with_priority(test.scheduler(), SchedulerPriority::Immediate, || {
        set_b.set(1);
    });
    assert_eq!(test.scheduler().pending_count(), 0);
    assert_eq!(test.scheduler().cancelled_total(), 1);

    test.flush_microtasks();
    assert_eq!(test.text(), "a0 b1");
    assert_eq!(test.root().pending_lanes(), Lanes::DEFAULT);

    test.flush();
    assert_eq!(test.text(), "a1 b1");
}

#[test]
fn same_lane_update_after_the_component_rendered_is_not_lost() {
    init_logger();
    let (a_slot, b_slot) = (Slot::default(), Slot::default());
    let test = TestRoot::new();
    test.render(pair(&a_slot, &b_slot).element());
    test.scheduler().set_yield_after(Some(0));

    setter(&a_slot).set(1);
    // root, then the component itself
    assert!(test.scheduler().run_next());
    assert!(test.scheduler().run_next());
    assert_eq!(test.text(), "a0 b0");

    setter(&b_slot).set(7);
    assert_eq!(test.root().pending_lanes(), Lanes::DEFAULT);
    test.flush();
    assert_eq!(test.text(), "a1 b7");
    assert!(test.root().pending_lanes().is_empty());
}

#[test]
fn same_lane_update_before_the_component_rendered_joins_the_pass() {
    init_logger();
    let (a_slot, b_slot) = (Slot::default(), Slot::default());
    let c_slot: Slot<SetState<i32>> = Slot::default();
    let c_out = Rc::clone(&c_slot);
    let later = Component::new("Later", move |_| {
        let (c, set_c) = use_state(|| 0);
        *c_out.borrow_mut() = Some(set_c);
        h("span").child(format!("c{c}")).into()
    });
    let test = TestRoot::new();
    test.render(
        h("div")
            .child(pair(&a_slot, &b_slot).element())
            .child(later.element()),
    );
    test.scheduler().set_yield_after(Some(0));

    setter(&a_slot).set(1);
    // root, then the div; neither component has rendered yet
    assert!(test.scheduler().run_next());
    assert!(test.scheduler().run_next());

    setter(&c_slot).set(5);
    test.flush();
    assert_eq!(test.text(), "a1 b0c5");
    assert!(test.root().pending_lanes().is_empty());
    assert!(!test.scheduler().has_pending());
}

#[test]
fn yielding_render_resumes_where_it_stopped() {
    init_logger();
    let (a_slot, b_slot) = (Slot::default(), Slot::default());
    let test = TestRoot::new();
    test.render(pair(&a_slot, &b_slot).element());
    test.scheduler().set_yield_after(Some(1));

    setter(&b_slot).set(3);
    test.flush();
    assert_eq!(test.text(), "a0 b3");
    assert!(test.scheduler().continuations() > 0);
}

#[test]
fn transition_shows_pending_before_the_new_value() {
    init_logger();
    let start_slot: Slot<StartTransition> = Slot::default();
    let value_slot: Slot<SetState<i32>> = Slot::default();
    let (start_out, value_out) = (Rc::clone(&start_slot), Rc::clone(&value_slot));
    let search = Component::new("Search", move |_| {
        let (pending, start) = use_transition();
        let (value, set_value) = use_state(|| 0);
        *start_out.borrow_mut() = Some(start);
        *value_out.borrow_mut() = Some(set_value);
        let status = if pending { "pending" } else { "idle" };
        h("p").child(format!("{status} {value}")).into()
    });
    let test = TestRoot::new();
    test.render(search.element());
    assert_eq!(test.text(), "idle 0");

    let start = start_slot.borrow().clone().expect("rendered");
    let set_value = setter(&value_slot);
    start.start(|| set_value.set(1));
    assert_eq!(
        test.root().pending_lanes(),
        Lanes::DEFAULT | Lanes::TRANSITION
    );

    assert!(test.scheduler().run_next());
    assert_eq!(test.text(), "pending 0");
    assert_eq!(test.root().pending_lanes(), Lanes::TRANSITION);
    assert_eq!(
        test.scheduler().pending_priorities(),
        vec![SchedulerPriority::Low]
    );

    test.flush();
    assert_eq!(test.text(), "idle 1");
}

#[test]
fn transition_scope_marks_plain_updates() {
    init_logger();
    let (a_slot, b_slot) = (Slot::default(), Slot::default());
    let test = TestRoot::new();
    test.render(pair(&a_slot, &b_slot).element());

    {
        let _transition = fibra_core::TransitionScope::enter();
        setter(&a_slot).set(4);
    }
    assert_eq!(test.root().pending_lanes(), Lanes::TRANSITION);
    assert_eq!(
        test.scheduler().pending_priorities(),
        vec![SchedulerPriority::Low]
    );
    test.flush();
    assert_eq!(test.text(), "a4 b0");
}

#[test]
fn render_phase_update_loop_stops_at_the_limit() {
    init_logger();
    let runaway = Component::new("Runaway", |_| {
        let (count, set_count) = use_state(|| 0);
        set_count.update(|n| n + 1);
        h("p").child(count).into()
    });
    let test = TestRoot::with_options(RootOptions::default().with_nested_update_limit(5));
    test.render(runaway.element());

    assert_eq!(
        test.take_render_error(),
        Some(RenderError::NestedUpdateLimit { limit: 5 })
    );
    assert!(test.root().pending_lanes().is_empty());
    assert!(!test.scheduler().has_pending());
}

#[test]
fn nested_update_limit_counts_commits() {
    init_logger();
    let renders = Rc::new(std::cell::Cell::new(0));
    let counted = Rc::clone(&renders);
    let runaway = Component::new("Runaway", move |_| {
        counted.set(counted.get() + 1);
        let (count, set_count) = use_state(|| 0);
        set_count.update(|n| n + 1);
        h("p").child(count).into()
    });
    let test = TestRoot::with_options(RootOptions::default().with_nested_update_limit(3));
    test.render(runaway.element());

    assert_eq!(renders.get(), 3);
    assert_eq!(test.text(), "2");
    assert_eq!(
        test.take_render_error(),
        Some(RenderError::NestedUpdateLimit { limit: 3 })
    );
}

#[test]
fn container_is_readable_during_render() {
    init_logger();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let test = Rc::new(TestRoot::new());
    let (probe, sink) = (Rc::downgrade(&test), Rc::clone(&seen));
    let reader = Component::new("ContainerReader", move |_| {
        if let Some(test) = probe.upgrade() {
            sink.borrow_mut().push(test.root().container());
        }
        Child::Empty
    });
    test.render(reader.element());

    assert_eq!(*seen.borrow(), vec![test.container()]);
}

#[test]
fn passive_flush_runs_before_the_next_render() {
    init_logger();
    let log: Rc<RefCell<Vec<String>>> = Rc::default();
    let sink = Rc::clone(&log);
    let logger = Component::new("Logger", move |props| {
        let id = props.int("id").unwrap_or(0);
        sink.borrow_mut().push(format!("render {id}"));
        let sink = Rc::clone(&sink);
        use_effect(None, move |_| {
            sink.borrow_mut().push(format!("effect {id}"));
            EffectResult::default()
        });
        Child::Empty
    });
    let test = TestRoot::new();
    test.root().render(logger.element().attr("id", 1));
    test.flush_microtasks();
    test.root().render(logger.element().attr("id", 2));
    test.flush();

    assert_eq!(
        *log.borrow(),
        vec!["render 1", "effect 1", "render 2", "effect 2"]
    );
}
