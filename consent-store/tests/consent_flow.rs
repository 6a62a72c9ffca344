//! Integration tests for the full consent banner lifecycle

use std::sync::Arc;
use std::time::Duration;

use consent_store::{
    ConsentStoreBuilder, ConsentValue, CookieBackend, CookiePolicy, MemoryCookieBackend,
    PermissionUpdate, StaticEnvironment, StoreUpdate,
};

fn build_store(backend: Arc<MemoryCookieBackend>) -> consent_store::ConsentStore {
    ConsentStoreBuilder::new()
        .backend(backend)
        .environment(StaticEnvironment::new(serde_json::json!({
            "policy_url": "/privacy"
        })))
        .configure(
            StoreUpdate::new()
                .permission("personalization", PermissionUpdate::new().required(true)),
        )
        .build()
        .expect("Failed to build store")
}

#[test]
fn test_first_visit_accept_and_reload() {
    let backend = Arc::new(MemoryCookieBackend::new());

    // First visit: empty backend, prompt opens
    let store = build_store(Arc::clone(&backend));
    store.initialize_cookies().expect("Hydration failed");
    assert!(store.should_open_basic_modal());
    assert_eq!(
        store.settings(),
        Some(serde_json::json!({ "policy_url": "/privacy" }))
    );

    // User opens the detail panel from the basic prompt, tweaks a
    // toggle, and saves
    store.open_extend_in_basic();
    assert!(store.panel_expanded());

    store.set_toggle("analytics").expect("Toggle failed");
    store.save_all_cookies().expect("Save failed");
    assert!(!store.panel_expanded());

    // Reload: a fresh store over the same backend sees the decisions
    let reloaded = build_store(Arc::clone(&backend));
    reloaded.initialize_cookies().expect("Hydration failed");

    assert!(!reloaded.should_open_basic_modal());
    assert!(reloaded.was_basic_cookie_accepted());
    assert_eq!(
        reloaded.permission_value("analytics"),
        Some(ConsentValue::Accepted)
    );
    assert_eq!(
        reloaded.permission_value("personalization"),
        Some(ConsentValue::Accepted)
    );
    assert!(reloaded.is_permission_accepted("analytics").unwrap());
}

#[test]
fn test_decline_is_forgotten_on_reload() {
    let backend = Arc::new(MemoryCookieBackend::new());

    let store = build_store(Arc::clone(&backend));
    store.initialize_cookies().expect("Hydration failed");

    // User declines: prompt closes for this session only
    store.set_all_false();
    assert!(!store.should_open_basic_modal());
    assert!(backend.is_empty());

    // Next session: no base cookie, prompt reopens, nothing remembered
    let reloaded = build_store(Arc::clone(&backend));
    reloaded.initialize_cookies().expect("Hydration failed");

    assert!(reloaded.should_open_basic_modal());
    assert!(!reloaded.has_basic_cookie());
    assert_eq!(
        reloaded.permission_value("analytics"),
        Some(ConsentValue::Unset)
    );
}

#[test]
fn test_custom_policy_round_trip() {
    let backend = Arc::new(MemoryCookieBackend::new());

    let store = ConsentStoreBuilder::new()
        .backend(Arc::clone(&backend))
        .policy(CookiePolicy::with_base_cookie_name("consent"))
        .build()
        .expect("Failed to build store");

    store.set_all_true().expect("Accept failed");

    assert_eq!(backend.get("consent").unwrap().as_deref(), Some("accepted"));
    assert_eq!(
        backend.get("consent-analytics").unwrap().as_deref(),
        Some("accepted")
    );
}

#[tokio::test(start_paused = true)]
async fn test_accept_all_with_animated_close() {
    let backend = Arc::new(MemoryCookieBackend::new());

    let store = build_store(Arc::clone(&backend));
    store.initialize_cookies().expect("Hydration failed");

    store.open_extend();
    store.save_all_cookies_slow().expect("Save failed");

    // Decisions are durable immediately, the panel lingers
    assert_eq!(backend.get("gdpr").unwrap().as_deref(), Some("accepted"));
    assert!(store.panel_expanded());

    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(!store.panel_expanded());
}
