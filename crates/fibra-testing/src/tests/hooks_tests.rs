use super::*;
use crate::prelude::*;
use fibra_core::{HookError, MutableRef};
use std::cell::RefCell;
use std::rc::Rc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn counter() -> Component {
    Component::new("Counter", |_| {
        let (count, set_count) = use_state(|| 0);
        h("button")
            .on("onClick", move || {
                set_count.update(|n| n + 1);
                set_count.update(|n| n + 1);
            })
            .child(count)
            .into()
    })
}

#[test]
fn state_updates_from_a_handler_rerender() {
    init_logger();
    let test = TestRoot::new();
    test.render(counter().element());
    assert_eq!(test.text(), "0");

    let button = test.host().find(test.container(), "button").expect("button");
    test.act(|| {
        assert!(test.host().invoke_handler(button, "onClick"));
    });
    assert_eq!(test.text(), "2");
    test.act(|| {
        test.host().invoke_handler(button, "onClick");
    });
    assert_eq!(test.text(), "4");
    assert_eq!(test.host().find(test.container(), "button"), Some(button));
}

#[test]
fn state_is_kept_per_component_instance() {
    init_logger();
    let counter = counter();
    let test = TestRoot::new();
    test.render(
        h("div")
            .child(counter.element().key("left"))
            .child(counter.element().key("right")),
    );
    let div = test.host().find(test.container(), "div").expect("div");
    let buttons = test.host().children_of(div);
    test.act(|| {
        test.host().invoke_handler(buttons[1], "onClick");
    });
    assert_eq!(test.text(), "02");
}

#[test]
fn use_ref_returns_the_same_cell_every_render() {
    init_logger();
    let seen: Rc<RefCell<Vec<MutableRef<i32>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let tracker = Component::new("RenderCount", move |_| {
        let renders = use_ref(|| 0);
        renders.update(|n| *n += 1);
        sink.borrow_mut().push(renders.clone());
        Child::Empty
    });
    let test = TestRoot::new();
    for _ in 0..3 {
        test.render(tracker.element());
    }
    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|cell| cell.ptr_eq(&seen[0])));
    assert_eq!(seen[0].get(), 3);
}

fn conditional_hooks() -> Component {
    Component::new("Flaky", |props| {
        let (value, _) = use_state(|| 1);
        if props.bool("extra").unwrap_or(false) {
            let _ = use_ref(|| 0);
        }
        h("span").child(value).into()
    })
}

#[test]
fn rendering_more_hooks_fails_the_render() {
    init_logger();
    let flaky = conditional_hooks();
    let test = TestRoot::new();
    test.render(flaky.element().attr("extra", false));
    assert!(test.take_render_error().is_none());

    test.render(flaky.element().attr("extra", true));
    let error = test.take_render_error().expect("render error");
    assert_eq!(
        error,
        RenderError::Hook(HookError::TooManyHooks {
            component: "Flaky".to_string(),
            previous: 1,
        })
    );
    assert_eq!(error.component(), Some("Flaky"));
    assert_eq!(test.text(), "1");
}

#[test]
fn rendering_fewer_hooks_fails_the_render() {
    init_logger();
    let flaky = conditional_hooks();
    let test = TestRoot::new();
    test.render(flaky.element().attr("extra", true));
    test.render(flaky.element().attr("extra", false));
    assert_eq!(
        test.take_render_error(),
        Some(RenderError::Hook(HookError::TooFewHooks {
            component: "Flaky".to_string(),
            previous: 2,
            rendered: 1,
        }))
    );
}

#[test]
fn panicking_component_is_reported_and_the_tree_survives() {
    init_logger();
    let exploding = Component::new("Exploding", |props| {
        if props.bool("explode").unwrap_or(false) {
            panic!("boom");
        }
        h("p").child("fine").into()
    });
    let test = TestRoot::new();
    test.render(exploding.element());
    test.render(exploding.element().attr("explode", true));

    match test.take_render_error() {
        Some(RenderError::ComponentPanicked { component, message }) => {
            assert_eq!(component, "Exploding");
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(test.text(), "fine");

    test.render(exploding.element());
    assert!(test.take_render_error().is_none());
}

#[test]
fn hooks_outside_a_render_raise_a_hook_error() {
    let result = std::panic::catch_unwind(|| {
        let _ = use_state(|| 0);
    });
    let payload = result.expect_err("use_state outside a render");
    assert_eq!(
        payload.downcast_ref::<HookError>(),
        Some(&HookError::OutsideRender { hook: "use_state" })
    );
}

#[test]
fn setters_survive_the_component_they_came_from() {
    init_logger();
    let setter = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&setter);
    let leaf = Component::new("Leaf", move |_| {
        let (value, set_value) = use_state(|| 0);
        *slot.borrow_mut() = Some(set_value);
        h("i").child(value).into()
    });
    let test = TestRoot::new();
    test.render(leaf.element());
    test.render(h("b"));

    let set_value = setter.borrow_mut().take().expect("setter captured");
    test.act(|| set_value.set(9));
    assert_eq!(test.dump(), "#container\n  <b>\n");
    assert!(test.take_render_error().is_none());
}
