use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use webpush_core::db::open_db_in_memory;
use webpush_core::{
    ManualClock, NewSubscription, RepoError, SqliteSubscriptionRepository, Store,
    SubscriptionRepository, SubscriptionState, SubscriptionValidationError,
};

const E1: &str = "https://push.example.com/send/e1";
const E2: &str = "https://push.example.com/send/e2";
const T0: i64 = 1_700_000_000_000;

fn store() -> (Store, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let store = Store::open_in_memory_with_clock(clock.clone()).unwrap();
    (store, clock)
}

fn endpoints(store: &Store, topic: &str) -> HashSet<String> {
    store
        .subscriptions_for_topic(topic)
        .unwrap()
        .into_iter()
        .map(|subscription| subscription.endpoint)
        .collect()
}

fn row_count(store: &Store, topics: &[&str]) -> usize {
    topics
        .iter()
        .map(|topic| store.subscriptions_for_topic(topic).unwrap().len())
        .sum()
}

#[test]
fn upsert_then_lookup_returns_endpoint_for_every_topic() {
    let (store, _) = store();
    store
        .upsert_subscription(E1, &["news", "sports"], Some("u1"), "auth1", "p256dh1")
        .unwrap();

    let news = store.subscriptions_for_topic("news").unwrap();
    assert_eq!(news.len(), 1);
    assert_eq!(news[0].endpoint, E1);
    assert_eq!(news[0].topic, "news");
    assert_eq!(news[0].user_id.as_deref(), Some("u1"));
    assert_eq!(news[0].key_auth, "auth1");
    assert_eq!(news[0].key_p256dh, "p256dh1");
    assert_eq!(news[0].updated_at, T0);
    assert_eq!(news[0].state(), SubscriptionState::Active);

    assert_eq!(endpoints(&store, "sports"), HashSet::from([E1.to_string()]));
    assert!(store.subscriptions_for_topic("weather").unwrap().is_empty());
}

#[test]
fn reupsert_replaces_topic_membership() {
    let (store, _) = store();
    store
        .upsert_subscription(E1, &["news", "sports"], None, "auth", "p256dh")
        .unwrap();
    assert_eq!(endpoints(&store, "news"), HashSet::from([E1.to_string()]));

    store
        .upsert_subscription(E1, &["sports"], None, "auth", "p256dh")
        .unwrap();
    assert!(endpoints(&store, "news").is_empty());
    assert_eq!(endpoints(&store, "sports"), HashSet::from([E1.to_string()]));

    store
        .upsert_subscription(E1, &["sports", "weather"], None, "auth", "p256dh")
        .unwrap();
    assert_eq!(endpoints(&store, "weather"), HashSet::from([E1.to_string()]));
}

#[test]
fn upsert_with_empty_topic_set_unsubscribes_everything() {
    let (store, _) = store();
    store
        .upsert_subscription(E1, &["news", "sports"], None, "auth", "p256dh")
        .unwrap();

    store
        .upsert_subscription::<&str>(E1, &[], None, "auth", "p256dh")
        .unwrap();

    assert_eq!(row_count(&store, &["news", "sports"]), 0);
}

#[test]
fn upserts_never_create_duplicate_rows() {
    let (store, _) = store();
    for _ in 0..3 {
        store
            .upsert_subscription(E1, &["news", "news", "sports"], None, "auth", "p256dh")
            .unwrap();
    }
    store
        .upsert_subscription(E2, &["news"], None, "auth", "p256dh")
        .unwrap();

    assert_eq!(store.subscriptions_for_topic("news").unwrap().len(), 2);
    assert_eq!(store.subscriptions_for_topic("sports").unwrap().len(), 1);
}

#[test]
fn upsert_does_not_touch_other_endpoints() {
    let (store, _) = store();
    store
        .upsert_subscription(E1, &["news"], None, "auth", "p256dh")
        .unwrap();
    store
        .upsert_subscription(E2, &["news"], None, "auth", "p256dh")
        .unwrap();

    store
        .upsert_subscription(E1, &["sports"], None, "auth", "p256dh")
        .unwrap();

    assert_eq!(endpoints(&store, "news"), HashSet::from([E2.to_string()]));
}

#[test]
fn upsert_refreshes_timestamp_and_key_material() {
    let (store, clock) = store();
    store
        .upsert_subscription(E1, &["news"], None, "old-auth", "old-p256dh")
        .unwrap();

    clock.advance(Duration::from_secs(60));
    store
        .upsert_subscription(E1, &["news"], Some("u1"), "new-auth", "new-p256dh")
        .unwrap();

    let rows = store.subscriptions_for_topic("news").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].updated_at, T0 + 60_000);
    assert_eq!(rows[0].key_auth, "new-auth");
    assert_eq!(rows[0].user_id.as_deref(), Some("u1"));
}

#[test]
fn invalid_upsert_is_rejected_without_touching_storage() {
    let (store, _) = store();
    store
        .upsert_subscription(E1, &["news"], None, "auth", "p256dh")
        .unwrap();

    let err = store
        .upsert_subscription(E1, &["sports", ""], None, "auth", "p256dh")
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(SubscriptionValidationError::EmptyTopic)
    ));

    let err = store
        .upsert_subscription("", &["news"], None, "auth", "p256dh")
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(SubscriptionValidationError::EmptyEndpoint)
    ));

    assert_eq!(endpoints(&store, "news"), HashSet::from([E1.to_string()]));
}

#[test]
fn failed_insert_rolls_back_the_whole_upsert() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(T0);
    let repo = SqliteSubscriptionRepository::new(&conn, &clock);

    let original = NewSubscription::new(E1, &["news", "sports"], None, "auth", "p256dh").unwrap();
    repo.upsert_subscription(&original).unwrap();

    conn.execute_batch(
        "CREATE TRIGGER reject_boom BEFORE INSERT ON subscriptions
         WHEN NEW.topic = 'boom'
         BEGIN
             SELECT RAISE(ABORT, 'boom topic rejected');
         END;",
    )
    .unwrap();

    let replacement = NewSubscription::new(E1, &["alerts", "boom"], None, "auth", "p256dh").unwrap();
    let err = repo.upsert_subscription(&replacement).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));

    let topics: HashSet<String> = ["news", "sports", "alerts"]
        .iter()
        .flat_map(|topic| repo.subscriptions_for_topic(topic).unwrap())
        .map(|subscription| subscription.topic)
        .collect();
    assert_eq!(
        topics,
        HashSet::from(["news".to_string(), "sports".to_string()])
    );
}

#[test]
fn remove_by_endpoint_deletes_all_rows_regardless_of_state() {
    let (store, clock) = store();
    store
        .upsert_subscription(E1, &["news", "sports"], None, "auth", "p256dh")
        .unwrap();
    store
        .upsert_subscription(E2, &["news"], None, "auth", "p256dh")
        .unwrap();

    clock.advance(Duration::from_secs(100));
    let targets = store
        .expire_and_get_expiring_subscriptions(Duration::from_secs(50), Duration::from_secs(500))
        .unwrap();
    assert_eq!(targets.len(), 2);

    assert_eq!(store.remove_subscriptions_by_endpoint(E1).unwrap(), 2);
    assert_eq!(endpoints(&store, "news"), HashSet::from([E2.to_string()]));
    assert!(store.subscriptions_for_topic("sports").unwrap().is_empty());
}

#[test]
fn remove_by_user_id_deletes_only_owned_rows() {
    let (store, _) = store();
    store
        .upsert_subscription(E1, &["news", "sports"], Some("u1"), "auth", "p256dh")
        .unwrap();
    store
        .upsert_subscription(E2, &["news"], None, "auth", "p256dh")
        .unwrap();

    assert_eq!(store.remove_subscriptions_by_user_id("u1").unwrap(), 2);
    assert_eq!(endpoints(&store, "news"), HashSet::from([E2.to_string()]));
}

#[test]
fn removals_are_noops_when_nothing_matches() {
    let (store, _) = store();
    store
        .upsert_subscription(E1, &["news"], None, "auth", "p256dh")
        .unwrap();

    assert_eq!(store.remove_subscriptions_by_endpoint(E2).unwrap(), 0);
    assert_eq!(store.remove_subscriptions_by_user_id("nobody").unwrap(), 0);
    assert_eq!(store.remove_subscriptions_by_user_id("").unwrap(), 0);
    assert_eq!(endpoints(&store, "news"), HashSet::from([E1.to_string()]));
}

#[test]
fn end_to_end_topic_change() {
    let (store, _) = store();
    store
        .upsert_subscription(E1, &["news", "sports"], None, "auth", "p256dh")
        .unwrap();
    let news: Vec<String> = store
        .subscriptions_for_topic("news")
        .unwrap()
        .into_iter()
        .map(|subscription| subscription.endpoint)
        .collect();
    assert_eq!(news, vec![E1.to_string()]);

    store
        .upsert_subscription(E1, &["sports"], None, "auth", "p256dh")
        .unwrap();
    assert!(store.subscriptions_for_topic("news").unwrap().is_empty());
    let sports: Vec<String> = store
        .subscriptions_for_topic("sports")
        .unwrap()
        .into_iter()
        .map(|subscription| subscription.endpoint)
        .collect();
    assert_eq!(sports, vec![E1.to_string()]);
}

#[test]
fn blank_user_id_never_removes_anonymous_subscriptions() {
    let (store, _) = store();
    store
        .upsert_subscription(E1, &["news"], Some("  "), "auth", "p256dh")
        .unwrap();
    store
        .upsert_subscription(E2, &["news"], None, "auth", "p256dh")
        .unwrap();
    assert!(store
        .subscriptions_for_topic("news")
        .unwrap()
        .iter()
        .all(|subscription| subscription.user_id.is_none()));

    assert_eq!(store.remove_subscriptions_by_user_id("").unwrap(), 0);
    assert_eq!(store.remove_subscriptions_by_user_id("  ").unwrap(), 0);
    assert_eq!(store.subscriptions_for_topic("news").unwrap().len(), 2);

    assert_eq!(store.remove_subscriptions_by_endpoint(E1).unwrap(), 1);
    assert_eq!(endpoints(&store, "news"), HashSet::from([E2.to_string()]));
}
