use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bic_runtime::contract::{ErrorCode, PageIdentity};
use bic_runtime::driver::{
    BrowserDriver, DriverResult, LaunchOptions, MockDriver, RawSnapshot,
};
use bic_runtime::perceiver::extract::LANDMARK_ATTR;
use bic_runtime::{BrowserToolHost, DriverFactory, ToolResult};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

/// Hands out mock drivers and remembers them so tests can inspect recorded actions.
#[derive(Default)]
struct MockFactory {
    opened: Mutex<Vec<(LaunchOptions, Arc<MockDriver>)>>,
}

impl MockFactory {
    fn last(&self) -> Arc<MockDriver> {
        self.opened.lock().unwrap().last().unwrap().1.clone()
    }
}

#[async_trait]
impl DriverFactory for MockFactory {
    async fn open(&self, options: LaunchOptions) -> DriverResult<Arc<dyn BrowserDriver>> {
        let shop = RawSnapshot::new(
            PageIdentity::from_url(options.url.clone())
                .with_title("Shop")
                .with_heading("Cart"),
        )
        .with_element("textbox", "Coupon", "input", &[(LANDMARK_ATTR, "main"), ("id", "coupon")])
        .with_element("button", "Delete cart", "button", &[(LANDMARK_ATTR, "main"), ("id", "delete")])
        .with_element("link", "About", "a", &[(LANDMARK_ATTR, "footer"), ("href", "/about")]);
        let receipt = RawSnapshot::new(
            PageIdentity::from_url("https://shop.example/receipt").with_title("Receipt"),
        );
        let driver = Arc::new(MockDriver::new(vec![shop, receipt]));
        driver.queue_download("https://shop.example/invoice.pdf", "invoice.pdf");
        self.opened.lock().unwrap().push((options, driver.clone()));
        Ok(driver as Arc<dyn BrowserDriver>)
    }
}

fn host() -> (BrowserToolHost, Arc<MockFactory>) {
    let factory = Arc::new(MockFactory::default());
    (BrowserToolHost::new(factory.clone()), factory)
}

fn value(result: ToolResult) -> Value {
    assert!(result.ok, "tool failed: {:?}", result.error);
    result.value.unwrap()
}

async fn open(host: &BrowserToolHost) -> String {
    let opened = value(
        host.call("browser_session_open", json!({"url": "https://shop.example/cart"}))
            .await,
    );
    opened["sessionId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn descriptors_cover_all_tools() {
    let names: Vec<_> = BrowserToolHost::descriptors()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(
        names,
        [
            "browser_session_open",
            "browser_session_close",
            "browser_observe",
            "browser_act",
            "browser_get_downloads",
            "browser_wait_for_download",
        ]
    );
    let act = BrowserToolHost::descriptors()
        .into_iter()
        .find(|d| d.name == "browser_act")
        .unwrap();
    assert!(act.input_schema["properties"]["observationId"].is_object());
}

#[tokio::test]
async fn open_observe_close() {
    let (host, factory) = host();
    let session = open(&host).await;
    assert_eq!(factory.opened.lock().unwrap()[0].0.headless, Some(true));

    let observation = value(
        host.call("browser_observe", json!({"sessionId": session, "maxAffordances": 2}))
            .await,
    );
    assert_eq!(observation["schemaVersion"], "0.1");
    assert_eq!(observation["affordances"].as_array().unwrap().len(), 2);
    assert_eq!(observation["hasMore"], true);
    assert_eq!(observation["page"]["domain"], "shop.example");

    let closed = value(host.call("browser_session_close", json!({"sessionId": session})).await);
    assert_eq!(closed, json!({"ok": true}));
    assert!(factory.last().is_closed());

    let again = host
        .call("browser_session_close", json!({"sessionId": session}))
        .await;
    assert_eq!(again.error.unwrap().code, ErrorCode::SessionNotFound);
}

#[tokio::test]
async fn act_gate_round_trip_through_tools() {
    let (host, factory) = host();
    let session = open(&host).await;
    let observation = value(host.call("browser_observe", json!({"sessionId": session})).await);
    let delete = observation["affordances"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["name"] == "Delete cart")
        .unwrap()
        .clone();
    assert_eq!(delete["risk"], "danger");

    let rejected = value(
        host.call(
            "browser_act",
            json!({
                "sessionId": session,
                "observationId": observation["observationId"],
                "target": {"kind": "element", "actionId": delete["actionId"], "risk": "danger", "label": "Delete cart"},
                "action": {"type": "click"}
            }),
        )
        .await,
    );
    assert_eq!(rejected["error"]["code"], "SAFETY_CONFIRMATION_REQUIRED");
    let required = rejected["error"]["details"]["requiredConfirmationText"].clone();
    assert_eq!(required, "CONFIRM click 'Delete cart' on shop.example");
    assert!(rejected["nextObservation"]["observationId"].is_string());
    assert!(factory.last().recorded_actions().is_empty());

    let fresh = &rejected["nextObservation"];
    let fresh_id = fresh["affordances"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["name"] == "Delete cart")
        .unwrap()["actionId"]
        .clone();
    let accepted = value(
        host.call(
            "browser_act",
            json!({
                "sessionId": session,
                "observationId": fresh["observationId"],
                "target": {"kind": "element", "actionId": fresh_id, "risk": "danger", "label": "Delete cart"},
                "action": {"type": "click"},
                "confirm": true,
                "confirmationText": required,
                "expect": {"headingContains": "cart"}
            }),
        )
        .await,
    );
    assert!(accepted.get("error").is_none());
    assert_eq!(accepted["verification"]["matched"], true);
    assert_eq!(factory.last().recorded_actions().len(), 1);
}

#[tokio::test]
async fn page_navigation_defaults_target() {
    let (host, _factory) = host();
    let session = open(&host).await;
    let observation = value(host.call("browser_observe", json!({"sessionId": session})).await);

    let outcome = value(
        host.call(
            "browser_act",
            json!({
                "sessionId": session,
                "observationId": observation["observationId"],
                "action": {"type": "navigate", "url": "https://shop.example/checkout"},
                "expect": {"urlContains": "checkout"}
            }),
        )
        .await,
    );
    assert_eq!(outcome["verification"]["matched"], false);
    assert_eq!(
        outcome["verification"]["observedDelta"]["url"],
        "https://shop.example/receipt"
    );
}

#[tokio::test]
async fn argument_errors_are_contract_mismatches() {
    let (host, _factory) = host();
    let cases = [
        ("browser_session_open", json!({"url": "nope"})),
        ("browser_observe", json!({"sessionId": "s", "maxAffordances": 500})),
        ("browser_observe", json!({"sessionId": "s", "verbose": true})),
        ("browser_act", json!({"sessionId": "s", "observationId": "o"})),
        ("browser_wait_for_download", json!({"sessionId": "s", "timeoutMs": 120000})),
        ("browser_teleport", json!({})),
    ];
    for (tool, arguments) in cases {
        let result = host.call(tool, arguments.clone()).await;
        let error = result.error.unwrap_or_else(|| panic!("{tool} {arguments} should fail"));
        assert_eq!(error.code, ErrorCode::ContractMismatch, "{tool} {arguments}");
    }
}

#[tokio::test]
async fn unknown_session_for_observe_and_downloads() {
    let (host, _factory) = host();
    for tool in ["browser_observe", "browser_get_downloads", "browser_wait_for_download"] {
        let result = host.call(tool, json!({"sessionId": "missing"})).await;
        assert_eq!(result.error.unwrap().code, ErrorCode::SessionNotFound, "{tool}");
    }
}

#[tokio::test]
async fn downloads_are_reported() {
    let (host, _factory) = host();
    let session = open(&host).await;

    let waited = value(
        host.call(
            "browser_wait_for_download",
            json!({"sessionId": session, "timeoutMs": 1000}),
        )
        .await,
    );
    assert_eq!(waited["download"]["suggestedFilename"], "invoice.pdf");

    let listed = value(host.call("browser_get_downloads", json!({"sessionId": session})).await);
    assert_eq!(listed["downloads"].as_array().unwrap().len(), 1);

    let none = value(
        host.call(
            "browser_wait_for_download",
            json!({"sessionId": session, "timeoutMs": 1000}),
        )
        .await,
    );
    assert_eq!(none["download"], Value::Null);
}

#[tokio::test]
async fn shutdown_closes_everything() {
    let (host, factory) = host();
    open(&host).await;
    open(&host).await;
    assert_eq!(host.shutdown().await, 2);
    assert!(factory
        .opened
        .lock()
        .unwrap()
        .iter()
        .all(|(_, driver)| driver.is_closed()));
    assert!(host.store().is_empty());
}
