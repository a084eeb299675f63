use fibra_testing::prelude::*;
use proptest::prelude::*;

fn item() -> Component {
    Component::new("Item", |props| {
        let id = props.int("id").unwrap_or_default();
        let (clicks, _) = use_state(|| id * 10);
        h("li")
            .attr("id", id)
            .child(format!("item {id} ({clicks})"))
            .into()
    })
}

fn view(item: &Component, ids: &[i64]) -> Child {
    h("ul")
        .children(ids.iter().map(|id| item.element().key(id).attr("id", *id)))
        .into()
}

fn ids() -> impl Strategy<Value = Vec<i64>> {
    proptest::sample::subsequence((0..12).collect::<Vec<i64>>(), 0..12).prop_shuffle()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn sliced_updates_commit_the_same_tree(
        before in ids(),
        after in ids(),
        budget in 0usize..6,
    ) {
        let item = item();

        let sliced = TestRoot::new();
        sliced.render(view(&item, &before));
        sliced.scheduler().set_yield_after(Some(budget));
        sliced.render(view(&item, &after));
        prop_assert!(sliced.root().pending_lanes().is_empty());

        let direct = TestRoot::new();
        direct.render(view(&item, &after));

        prop_assert_eq!(sliced.dump(), direct.dump());
    }
}

#[test]
fn zero_budget_still_finishes() {
    let _ = env_logger::builder().is_test(true).try_init();
    let item = item();
    let test = TestRoot::new();
    test.render(view(&item, &[1, 2, 3]));
    test.scheduler().set_yield_after(Some(0));
    test.render(view(&item, &[3, 2, 1, 4]));

    assert_eq!(test.text(), "item 3 (30)item 2 (20)item 1 (10)item 4 (40)");
    assert!(test.scheduler().continuations() >= 4);
}
