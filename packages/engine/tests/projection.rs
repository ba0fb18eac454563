//! End-to-end projection tests over storage trees holding remote maps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use storeview_core::{
    selector, BigMapHandle, Error, KeyedContainer, MapKey, RemoteMap, RemoteMapResolver,
    StorageValue,
};
use storeview_engine::{FieldError, FieldOutcome, Projector};

/// What a scripted remote map does when asked for a key.
#[derive(Clone)]
enum Reply {
    Found(JsonValue, Duration),
    Fail(u16),
}

/// A remote map answering from a fixed script, after an optional delay.
struct ScriptedMap {
    pointer: String,
    replies: HashMap<MapKey, Reply>,
    calls: AtomicUsize,
    completed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedMap {
    fn new(pointer: &str) -> Self {
        Self {
            pointer: pointer.to_string(),
            replies: HashMap::new(),
            calls: AtomicUsize::new(0),
            completed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Record completed lookups into `log`, which other maps may share.
    fn logging_to(mut self, log: &Arc<Mutex<Vec<String>>>) -> Self {
        self.completed = log.clone();
        self
    }

    fn found(mut self, key: impl Into<MapKey>, value: JsonValue) -> Self {
        self.replies
            .insert(key.into(), Reply::Found(value, Duration::ZERO));
        self
    }

    fn found_after(mut self, key: impl Into<MapKey>, value: JsonValue, millis: u64) -> Self {
        self.replies.insert(
            key.into(),
            Reply::Found(value, Duration::from_millis(millis)),
        );
        self
    }

    fn failing(mut self, key: impl Into<MapKey>, status: u16) -> Self {
        self.replies.insert(key.into(), Reply::Fail(status));
        self
    }
}

#[async_trait]
impl KeyedContainer for ScriptedMap {
    async fn try_get(&self, key: &MapKey) -> Result<Option<StorageValue>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = match self.replies.get(key).cloned() {
            None => Ok(None),
            Some(Reply::Found(value, delay)) => {
                tokio::time::sleep(delay).await;
                StorageValue::from_json(value, None).map(Some)
            }
            Some(Reply::Fail(status)) => Err(Error::RemoteStatus {
                status,
                message: format!("scripted failure for {}", key),
            }),
        };
        self.completed.lock().unwrap().push(key.canonical());
        result
    }
}

impl RemoteMap for ScriptedMap {
    fn pointer(&self) -> &str {
        &self.pointer
    }
}

/// Hands out prepared scripted maps by pointer.
#[derive(Default)]
struct ScriptedResolver {
    maps: HashMap<String, Arc<ScriptedMap>>,
}

impl ScriptedResolver {
    fn with(mut self, map: ScriptedMap) -> Self {
        self.maps.insert(map.pointer.clone(), Arc::new(map));
        self
    }

    fn map(&self, pointer: &str) -> Arc<ScriptedMap> {
        self.maps[pointer].clone()
    }
}

impl RemoteMapResolver for ScriptedResolver {
    fn resolve(&self, pointer: &str) -> Result<Arc<dyn RemoteMap>, Error> {
        self.maps
            .get(pointer)
            .map(|map| map.clone() as Arc<dyn RemoteMap>)
            .ok_or_else(|| Error::snapshot(format!("unknown big map {}", pointer)))
    }
}

fn pair_key(first: (&str, &str), second: (&str, &str)) -> MapKey {
    MapKey::composite([
        (first.0, MapKey::from(first.1)),
        (second.0, MapKey::from(second.1)),
    ])
}

fn access_requests() -> ScriptedMap {
    ScriptedMap::new("11")
        .found(
            pair_key(("scopeId", "scope1"), ("status", "status1")),
            json!({
                "address": { "providerAddress": "tz1provider", "requesterAddress": "tz1requester" },
                "createdAt": "2019-10-22T16:27:54.000Z",
                "jwtToken": "jwtToken"
            }),
        )
        .found(
            pair_key(("scopeId", "scope2"), ("status", "status2")),
            json!({
                "address": { "providerAddress": "tz1requester", "requesterAddress": "tz1provider" },
                "createdAt": "2019-10-22T16:28:10.000Z",
                "jwtToken": null
            }),
        )
}

fn organizations() -> ScriptedMap {
    ScriptedMap::new("12").found(
        pair_key(("address", "tz1requester"), ("jwtToken", "jwt")),
        json!({
            "datasources": { "$map": [
                { "key": "datasource1", "value": "value1" },
                { "key": "datasource2", "value": "value2" },
                { "key": "datasource3", "value": "value3" }
            ] },
            "name": "toto",
            "publicKey": "toto public key",
            "publicKeyHash": "tz1requester"
        }),
    )
}

fn registry_storage(resolver: &ScriptedResolver) -> StorageValue {
    StorageValue::from_json(
        json!({
            "accessRequests": { "$big_map": "11" },
            "organizations": { "$big_map": { "id": "12", "size": 1 } },
            "decimals": 10,
            "owner": "tz1owner"
        }),
        Some(resolver),
    )
    .unwrap()
}

fn resolver() -> ScriptedResolver {
    ScriptedResolver::default()
        .with(access_requests())
        .with(organizations())
}

#[tokio::test]
async fn big_map_keys_with_and_without_value() {
    let resolver = resolver();
    let storage = registry_storage(&resolver);
    let selectors = selector::from_value(json!([{
        "accessRequests": [
            { "key": { "scopeId": "scope1", "status": "status1" } },
            { "key": { "scopeId": "scope1", "status": "status2" } },
            { "key": { "status": "status2", "scopeId": "scope2" } }
        ]
    }]))
    .unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();

    assert_eq!(
        projection.to_json(),
        json!({
            "accessRequests": [
                {
                    "key": { "scopeId": "scope1", "status": "status1" },
                    "value": {
                        "address": { "providerAddress": "tz1provider", "requesterAddress": "tz1requester" },
                        "createdAt": "2019-10-22T16:27:54.000Z",
                        "jwtToken": "jwtToken"
                    }
                },
                {
                    "key": { "scopeId": "scope1", "status": "status2" },
                    "error": "The current map does not contain this key"
                },
                {
                    "key": { "status": "status2", "scopeId": "scope2" },
                    "value": {
                        "address": { "providerAddress": "tz1requester", "requesterAddress": "tz1provider" },
                        "createdAt": "2019-10-22T16:28:10.000Z",
                        "jwtToken": null
                    }
                }
            ]
        })
    );
}

#[tokio::test]
async fn nested_selectors_mix_paths_and_inner_maps() {
    let resolver = resolver();
    let storage = registry_storage(&resolver);
    let selectors = selector::from_value(json!([
        {
            "accessRequests": [ {
                "key": { "scopeId": "scope1", "status": "status1" },
                "dataFields": [
                    "address.requesterAddress",
                    "address.provider",
                    "jwtToken",
                    "jwtToken.createdAt",
                    "requesterAddress"
                ]
            } ]
        },
        {
            "organizations": [ {
                "key": { "address": "tz1requester", "jwtToken": "jwt" },
                "dataFields": [
                    { "datasources": [ { "key": "datasource1" }, { "key": "datasource4" } ] },
                    { "name": [ { "key": "datasource1" } ] }
                ]
            } ]
        },
        { "accessRequests2": [ { "key": "anything" } ] }
    ]))
    .unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();

    let not_found = json!({ "error": "This data field does not exist in the contract storage" });
    assert_eq!(
        projection.to_json(),
        json!({
            "accessRequests": [ {
                "key": { "scopeId": "scope1", "status": "status1" },
                "value": {
                    "address.requesterAddress": "tz1requester",
                    "address.provider": not_found,
                    "jwtToken": "jwtToken",
                    "jwtToken.createdAt": not_found,
                    "requesterAddress": not_found
                }
            } ],
            "organizations": [ {
                "key": { "address": "tz1requester", "jwtToken": "jwt" },
                "value": {
                    "datasources": [
                        { "key": "datasource1", "value": "value1" },
                        { "key": "datasource4", "error": "The current map does not contain this key" }
                    ],
                    "name": {
                        "error": "This data field does not have type MichelsonMap or BigMap, use simple string to access to the properties"
                    }
                }
            } ],
            "accessRequests2": not_found
        })
    );
}

#[tokio::test]
async fn found_value_with_inner_map_is_normalized() {
    let resolver = resolver();
    let storage = registry_storage(&resolver);
    let selectors = selector::from_value(json!([{
        "organizations": [ { "key": { "address": "tz1requester", "jwtToken": "jwt" } } ]
    }]))
    .unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();

    assert_eq!(
        projection.to_json()["organizations"][0]["value"]["datasources"],
        json!([
            { "key": "datasource1", "value": "value1" },
            { "key": "datasource2", "value": "value2" },
            { "key": "datasource3", "value": "value3" }
        ])
    );
}

#[tokio::test]
async fn big_map_path_renders_pointer() {
    let resolver = resolver();
    let storage = registry_storage(&resolver);
    let selectors = selector::from_value(json!(["accessRequests", "organizations"])).unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();

    assert_eq!(
        projection.to_json(),
        json!({
            "accessRequests": { "type": "big_map", "value": "11" },
            "organizations": { "type": "big_map", "value": "12", "size": 1 }
        })
    );
    assert_eq!(
        resolver.map("11").calls.load(Ordering::SeqCst),
        0,
        "rendering a big map must not fetch its entries"
    );
}

#[tokio::test]
async fn entry_order_ignores_completion_order() {
    let slow = ScriptedMap::new("20")
        .found_after("first", json!(1), 60)
        .found_after("second", json!(2), 30)
        .found_after("third", json!(3), 0);
    let resolver = ScriptedResolver::default().with(slow);
    let storage =
        StorageValue::from_json(json!({ "balances": { "$big_map": "20" } }), Some(&resolver))
            .unwrap();
    let selectors = selector::from_value(json!([{
        "balances": [ { "key": "first" }, { "key": "second" }, { "key": "third" } ]
    }]))
    .unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();

    assert_eq!(
        projection.to_json(),
        json!({
            "balances": [
                { "key": "first", "value": 1 },
                { "key": "second", "value": 2 },
                { "key": "third", "value": 3 }
            ]
        })
    );
    let completed = resolver.map("20").completed.lock().unwrap().clone();
    assert_eq!(completed, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn sibling_selectors_are_read_concurrently() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let resolver = ScriptedResolver::default()
        .with(
            ScriptedMap::new("21")
                .found_after("slow", json!("s"), 80)
                .logging_to(&log),
        )
        .with(
            ScriptedMap::new("22")
                .found_after("fast", json!("f"), 0)
                .logging_to(&log),
        );
    let storage = StorageValue::from_json(
        json!({ "left": { "$big_map": "21" }, "right": { "$big_map": "22" } }),
        Some(&resolver),
    )
    .unwrap();
    let selectors = selector::from_value(json!([
        { "left": [ { "key": "slow" } ] },
        { "right": [ { "key": "fast" } ] }
    ]))
    .unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();

    // The second selector finished while the first was still waiting.
    assert_eq!(*log.lock().unwrap(), vec!["fast", "slow"]);
    assert_eq!(
        projection.to_json(),
        json!({
            "left": [ { "key": "slow", "value": "s" } ],
            "right": [ { "key": "fast", "value": "f" } ]
        })
    );
}

#[tokio::test]
async fn remote_failure_aborts_projection() {
    let failing = ScriptedMap::new("30")
        .found("ok", json!("fine"))
        .failing("broken", 500);
    let resolver = ScriptedResolver::default().with(failing);
    let storage = StorageValue::from_json(
        json!({ "data": { "$big_map": "30" }, "name": "x" }),
        Some(&resolver),
    )
    .unwrap();
    let selectors = selector::from_value(json!([
        "name",
        { "data": [ { "key": "ok" }, { "key": "broken" } ] }
    ]))
    .unwrap();

    let err = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RemoteStatus { status: 500, .. }));
}

/// Collects everything a `fmt` subscriber writes.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[tokio::test]
async fn unexpected_error_is_logged_once_with_context() {
    let captured = CapturedLog::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let failing = ScriptedMap::new("31")
        .found("outer", json!({ "inner": 1 }))
        .failing("broken", 502);
    let resolver = ScriptedResolver::default().with(failing);
    let storage = StorageValue::from_json(
        json!({ "data": { "$big_map": "31" }, "name": "x" }),
        Some(&resolver),
    )
    .unwrap();
    let selectors = selector::from_value(json!([
        "name",
        { "data": [ { "key": "outer", "dataFields": ["inner"] }, { "key": "broken" } ] }
    ]))
    .unwrap();

    let err = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RemoteStatus { status: 502, .. }));

    let text = captured.text();
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| line.contains("unexpected error while projecting contract storage"))
        .collect();
    assert_eq!(lines.len(), 1, "{}", text);
    assert!(lines[0].contains("ERROR"));
    assert!(lines[0].contains("selectors=[Path("));
    assert!(lines[0].contains("Container {"));
    assert!(lines[0].contains("storage=object {data, name}"));
    assert!(lines[0].contains("error=remote store answered 502"));
}

#[tokio::test]
async fn one_entry_per_non_blank_selector_in_order() {
    let storage = StorageValue::from_json(json!({ "a": 1, "b": 2, "c": 3 }), None).unwrap();
    let selectors = selector::from_value(json!(["c", "", "a", {}, "missing", "b"])).unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();

    let names: Vec<&str> = projection.iter().map(|entry| entry.key.as_str()).collect();
    assert_eq!(names, vec!["c", "a", "missing", "b"]);
    assert_eq!(
        projection.get("missing"),
        Some(&FieldOutcome::Error(FieldError::FieldNotFound))
    );
}

#[tokio::test]
async fn blank_selectors_give_empty_object() {
    let storage = StorageValue::from_json(json!({ "a": 1 }), None).unwrap();
    let selectors = selector::from_value(json!(["", {}])).unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();
    assert!(projection.is_empty());
    assert_eq!(projection.to_json(), json!({}));
}

#[tokio::test]
async fn container_named_by_empty_string_is_reported() {
    let storage = StorageValue::from_json(json!({ "a": 1 }), None).unwrap();
    let selectors = selector::from_value(json!([{ "": [ { "key": "x" } ] }, "a"])).unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();

    assert_eq!(projection.len(), selectors.len());
    assert_eq!(
        projection.to_json(),
        json!({
            "": { "error": "This data field does not exist in the contract storage" },
            "a": 1
        })
    );
}

#[tokio::test]
async fn nonexistent_field() {
    let storage = StorageValue::from_json(json!({ "a": 1 }), None).unwrap();
    let selectors = selector::from_value(json!(["nonexistent"])).unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();
    assert_eq!(
        projection.to_json(),
        json!({ "nonexistent": { "error": "This data field does not exist in the contract storage" } })
    );
}

#[tokio::test]
async fn container_selector_on_scalar_is_type_mismatch() {
    let storage = StorageValue::from_json(json!({ "decimals": 10 }), None).unwrap();
    let selectors = selector::from_value(json!([{ "decimals": [ { "key": "x" } ] }])).unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();
    assert_eq!(
        projection.get("decimals"),
        Some(&FieldOutcome::Error(FieldError::TypeMismatch))
    );
}

#[tokio::test]
async fn duplicate_names_are_appended() {
    let storage = StorageValue::from_json(
        json!({ "ledger": { "$map": [ { "key": "a", "value": 1 }, { "key": "b", "value": 2 } ] } }),
        None,
    )
    .unwrap();
    let selectors = selector::from_value(json!([
        { "ledger": [ { "key": "a" } ] },
        { "ledger": [ { "key": "b" } ] }
    ]))
    .unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();
    assert_eq!(projection.len(), 2);
    assert_eq!(
        serde_json::to_string(&projection).unwrap(),
        r#"{"ledger":[{"key":"a","value":1}],"ledger":[{"key":"b","value":2}]}"#
    );
}

#[tokio::test]
async fn projecting_twice_gives_same_output() {
    let resolver = resolver();
    let storage = registry_storage(&resolver);
    let selectors = selector::from_value(json!([
        "decimals",
        "owner",
        { "accessRequests": [ { "key": { "scopeId": "scope1", "status": "status1" }, "dataFields": ["jwtToken"] } ] }
    ]))
    .unwrap();
    let projector = Projector::default();

    let first = projector.project(&selectors, &storage).await.unwrap();
    let second = projector.project(&selectors, &storage).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn normalized_map_lists_each_key_once() {
    let storage = StorageValue::from_json(
        json!({ "ledger": { "$map": [
            { "key": "tz1a", "value": 1 },
            { "key": "tz1b", "value": 2 },
            { "key": "tz1a", "value": 3 }
        ] } }),
        None,
    )
    .unwrap();

    let projection = Projector::default()
        .project(&selector::from_value(json!(["ledger"])).unwrap(), &storage)
        .await
        .unwrap();

    assert_eq!(
        projection.to_json(),
        json!({ "ledger": [ { "key": "tz1a", "value": 3 }, { "key": "tz1b", "value": 2 } ] })
    );
}

#[tokio::test]
async fn handle_built_in_code_is_looked_up() {
    let map = Arc::new(ScriptedMap::new("40").found(7u64, json!({ "$int": "123" })));
    let storage = StorageValue::object([(
        "counters",
        BigMapHandle::new(map.clone(), None).into(),
    )]);
    let selectors = selector::from_value(json!([{ "counters": [ { "key": 7 }, { "key": "7" } ] }]))
        .unwrap();

    let projection = Projector::default()
        .project(&selectors, &storage)
        .await
        .unwrap();

    assert_eq!(
        projection.to_json(),
        json!({ "counters": [ { "key": 7, "value": 123 }, { "key": "7", "value": 123 } ] })
    );
    assert_eq!(map.calls.load(Ordering::SeqCst), 2);
}
