mod support;

use std::sync::Arc;
use std::time::Duration;

use neptun_engine::catalog::{ElementSpec, SelectorCatalog};
use neptun_engine::protocol::{EventType, LocatorStrategy, StrategyKind};
use neptun_engine::resolver::{ElementResolver, ResolveError};
use neptun_engine::sink::CollectingSink;

use support::{FakeDriver, FakeElement};

fn catalog() -> Arc<SelectorCatalog> {
    Arc::new(
        SelectorCatalog::from_specs(vec![
            ElementSpec::new(
                "login-button",
                "fallback chain of three",
                vec![
                    LocatorStrategy::css("button.login"),
                    LocatorStrategy::xpath("//form/button"),
                    LocatorStrategy::text_contains("Autentificare"),
                ],
            ),
            ElementSpec::new(
                "ghost",
                "matches nothing",
                vec![
                    LocatorStrategy::css("div.ghost"),
                    LocatorStrategy::xpath("//div[@class='ghost']"),
                ],
            ),
        ])
        .unwrap(),
    )
}

fn resolver(sink: Arc<CollectingSink>) -> ElementResolver {
    ElementResolver::new(catalog(), sink, "test-session", Duration::from_millis(5))
}

#[tokio::test]
async fn primary_strategy_wins_when_it_matches() {
    let sink = Arc::new(CollectingSink::new());
    let resolver = resolver(Arc::clone(&sink));
    let mut driver = FakeDriver::new("page").page(
        "page",
        vec![FakeElement::css("button.login").text("Autentificare")],
    );

    let handle = resolver
        .resolve(&mut driver, "login-button", Duration::from_millis(60))
        .await
        .unwrap();
    assert_eq!(handle.strategy_used, StrategyKind::Css);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Resolve);
    assert!(events[0].success);
    assert_eq!(events[0].strategy_used, Some(StrategyKind::Css));
}

#[tokio::test]
async fn fallback_reaches_later_strategies_in_order() {
    let sink = Arc::new(CollectingSink::new());
    let resolver = resolver(Arc::clone(&sink));
    // Neither structural selector matches; only the text strategy does.
    let mut driver = FakeDriver::new("page").page(
        "page",
        vec![FakeElement::css("button.other").text("Autentificare acum")],
    );

    let handle = resolver
        .resolve(&mut driver, "login-button", Duration::from_millis(60))
        .await
        .unwrap();
    assert_eq!(handle.strategy_used, StrategyKind::TextContains);
}

#[tokio::test]
async fn exhausting_every_strategy_reports_the_full_attempt_log() {
    let sink = Arc::new(CollectingSink::new());
    let resolver = resolver(Arc::clone(&sink));
    let mut driver = FakeDriver::new("page").page("page", vec![]);

    let err = resolver
        .resolve(&mut driver, "ghost", Duration::from_millis(40))
        .await
        .unwrap_err();
    match err {
        ResolveError::ElementNotFound { name, attempted } => {
            assert_eq!(name, "ghost");
            assert_eq!(attempted.len(), 2);
            assert!(attempted[0].starts_with("css:"));
            assert!(attempted[1].starts_with("xpath:"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert!(!events[0].success);
}

#[tokio::test]
async fn unknown_name_is_a_catalog_error() {
    let sink = Arc::new(CollectingSink::new());
    let resolver = resolver(sink);
    let mut driver = FakeDriver::new("page").page("page", vec![]);

    let err = resolver
        .resolve(&mut driver, "never-registered", Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Catalog(_)));
}

#[tokio::test]
async fn resolve_all_returns_whole_collection_of_winning_strategy() {
    let sink = Arc::new(CollectingSink::new());
    let resolver = resolver(sink);
    let mut driver = FakeDriver::new("page").page(
        "page",
        vec![
            FakeElement::css("button.login").text("one"),
            FakeElement::css("button.login").text("two"),
            FakeElement::css("button.login").text("three"),
        ],
    );

    let set = resolver
        .resolve_all(&mut driver, "login-button", Duration::from_millis(60))
        .await
        .unwrap();
    assert_eq!(set.ids.len(), 3);
    assert_eq!(set.strategy_used, StrategyKind::Css);
}
