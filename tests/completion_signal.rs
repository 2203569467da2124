use std::time::Duration;

use schemaflow::runtime::signal::{CompletionSignal, CompletionState};

#[tokio::test]
async fn wait_before_publish_suspends_until_published() {
    let signal = CompletionSignal::new();
    let waiter = {
        let signal = signal.clone();
        tokio::spawn(async move { signal.wait("PoeDb").await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    signal.publish("PoeDb", 4);
    let done = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter woke")
        .expect("join");
    assert_eq!(done.namespace, "PoeDb");
    assert_eq!(done.version, 4);
}

#[tokio::test]
async fn wait_after_publish_returns_latest_immediately() {
    let signal = CompletionSignal::new();
    signal.publish("PoeNinja", 1);
    signal.publish("PoeNinja", 2);

    let done = tokio::time::timeout(Duration::from_millis(50), signal.wait("PoeNinja"))
        .await
        .expect("cached value");
    assert_eq!(done.version, 2);
}

#[tokio::test]
async fn many_waiters_across_namespaces_each_resolve_once() {
    let signal = CompletionSignal::new();
    let mut waiters = Vec::new();
    for i in 0..16 {
        let signal = signal.clone();
        let namespace = if i % 2 == 0 { "Leagues" } else { "Skills" };
        waiters.push(tokio::spawn(async move { signal.wait(namespace).await }));
    }

    tokio::task::yield_now().await;
    signal.publish("Leagues", 3);
    signal.publish("Skills", 7);

    for waiter in waiters {
        let done = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("woke")
            .expect("join");
        let expected = if done.namespace == "Leagues" { 3 } else { 7 };
        assert_eq!(done.version, expected);
    }
}

#[tokio::test]
async fn publishing_one_namespace_leaves_others_pending() {
    let signal = CompletionSignal::new();
    signal.publish("Leagues", 1);

    assert!(signal.wait_timeout("Gems", Duration::from_millis(30)).await.is_none());
    assert_eq!(signal.state("Gems"), CompletionState::Pending);
    assert_eq!(
        signal.wait_timeout("Leagues", Duration::from_millis(30)).await.map(|c| c.version),
        Some(1)
    );
}

#[tokio::test]
async fn subscribers_observe_each_new_version() {
    let signal = CompletionSignal::new();
    let mut rx = signal.subscribe("Skills");
    assert_eq!(*rx.borrow(), CompletionState::Pending);

    signal.publish("Skills", 1);
    rx.changed().await.expect("changed");
    assert_eq!(*rx.borrow_and_update(), CompletionState::Completed(1));

    signal.publish("Skills", 2);
    rx.changed().await.expect("changed");
    assert_eq!(*rx.borrow_and_update(), CompletionState::Completed(2));
}
