use super::*;
use crate::prelude::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn theme_reader(theme: &fibra_core::Context<String>) -> Component {
    let theme = theme.clone();
    Component::new("ThemeReader", move |_| {
        let value = use_context(&theme);
        h("em").child(value).into()
    })
}

#[test]
fn reader_outside_a_provider_gets_the_default() {
    init_logger();
    let theme = create_context("light".to_string());
    let test = TestRoot::new();
    test.render(theme_reader(&theme).element());
    assert_eq!(test.text(), "light");
}

#[test]
fn nearest_provider_wins() {
    init_logger();
    let theme = create_context("light".to_string());
    let reader = theme_reader(&theme);
    let test = TestRoot::new();
    test.render(
        theme.provider("dark".to_string()).child(
            h("div")
                .child(reader.element())
                .child(theme.provider("blue".to_string()).child(reader.element()))
                .child(reader.element()),
        ),
    );
    assert_eq!(test.text(), "darkbluedark");
}

#[test]
fn provider_value_change_reaches_readers() {
    init_logger();
    let theme = create_context("light".to_string());
    let reader = theme_reader(&theme);
    let test = TestRoot::new();
    test.render(theme.provider("dark".to_string()).child(reader.element()));
    let em = test.host().find(test.container(), "em");

    test.render(theme.provider("sepia".to_string()).child(reader.element()));
    assert_eq!(test.text(), "sepia");
    assert_eq!(test.host().find(test.container(), "em"), em);
}

#[test]
fn separate_contexts_do_not_interfere() {
    init_logger();
    let theme = create_context("light".to_string());
    let locale = create_context("en".to_string());
    let (theme_reader, locale_reader) = (theme_reader(&theme), {
        let locale = locale.clone();
        Component::new("LocaleReader", move |_| use_context(&locale).into())
    });
    let test = TestRoot::new();
    test.render(
        locale.provider("fr".to_string()).child(
            fragment()
                .child(theme_reader.element())
                .child(locale_reader.element()),
        ),
    );
    assert_eq!(test.text(), "lightfr");
}

fn boundary(suspended: bool) -> Child {
    suspense(h("p").child("loading"))
        .suspended(suspended)
        .child(h("article").child("content"))
        .into()
}

#[test]
fn suspending_hides_content_and_shows_the_fallback() {
    init_logger();
    let test = TestRoot::new();
    test.render(boundary(false));
    let article = test.host().find(test.container(), "article").expect("article");
    assert_eq!(test.top_level(), vec![article]);

    test.render(boundary(true));
    assert!(test.host().is_hidden(article));
    let fallback = test.host().find(test.container(), "p").expect("fallback");
    assert_eq!(test.top_level(), vec![article, fallback]);
    assert!(test.host().ops().contains(&HostOp::Hide(article)));

    test.render(boundary(false));
    assert!(!test.host().is_hidden(article));
    assert_eq!(test.top_level(), vec![article]);
    assert_eq!(test.host().removal_count(fallback), 1);
    assert_eq!(test.host().removal_count(article), 0);
}

#[test]
fn mounting_suspended_keeps_content_hidden() {
    init_logger();
    let test = TestRoot::new();
    test.render(boundary(true));
    let article = test.host().find(test.container(), "article").expect("article");
    assert!(test.host().is_hidden(article));
    assert_eq!(test.text(), "contentloading");
    assert_eq!(
        test.dump(),
        "#container\n  <article> hidden\n    \"content\"\n  <p>\n    \"loading\"\n"
    );

    test.render(boundary(false));
    assert_eq!(test.text(), "content");
    assert!(test.host().ops().contains(&HostOp::Unhide(article)));
}

#[test]
fn hidden_content_keeps_its_state() {
    init_logger();
    let counter = Component::new("Clicks", |_| {
        let (clicks, set_clicks) = use_state(|| 0);
        h("button")
            .on("onClick", move || set_clicks.update(|n| n + 1))
            .child(clicks)
            .into()
    });
    let view = |suspended: bool| -> Child {
        suspense(text("wait"))
            .suspended(suspended)
            .child(counter.element())
            .into()
    };
    let test = TestRoot::new();
    test.render(view(false));
    let button = test.host().find(test.container(), "button").expect("button");
    test.act(|| {
        test.host().invoke_handler(button, "onClick");
    });

    test.render(view(true));
    test.render(view(false));
    assert_eq!(test.host().text_content(button), "1");
    assert_eq!(test.text(), "1");
}
