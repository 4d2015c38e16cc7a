//! Browser tests, run with `wasm-pack test --headless --firefox`

#![cfg(target_arch = "wasm32")]

use cart_core::KeyValueStore;
use cart_wasm::{BrowserStorage, StorageArea, WasmCart, WasmSessionCache};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn browser_storage_round_trip() {
    let store = BrowserStorage::open(StorageArea::Session).unwrap();
    store.set("web_test_key", "value").unwrap();
    assert_eq!(store.get("web_test_key").unwrap().as_deref(), Some("value"));
    assert!(store.keys().unwrap().contains(&"web_test_key".to_string()));

    store.remove("web_test_key").unwrap();
    assert_eq!(store.get("web_test_key").unwrap(), None);
}

#[wasm_bindgen_test]
fn cart_survives_reload() {
    let mut cart = WasmCart::with_key("web_test_cart");
    cart.clear();
    cart.add_line("1".into(), "One".into(), 2.0, 3);

    let reloaded = WasmCart::with_key("web_test_cart");
    assert_eq!(reloaded.item_count(), 3);
    assert_eq!(reloaded.fingerprint(), cart.fingerprint());

    cart.clear();
    assert!(WasmCart::with_key("web_test_cart").is_empty());
}

#[wasm_bindgen_test]
fn session_cache_put_get_evict() {
    let cache = WasmSessionCache::new();
    cache.evict_all();

    cache.put("fp_web", "sec_abc", 1.5, "usd").unwrap();
    assert_eq!(cache.get("fp_web").as_deref(), Some("sec_abc"));
    assert_eq!(cache.get("fp_other"), None);

    assert_eq!(cache.evict_expired(), 0);
    assert_eq!(cache.evict_all(), 1);
    assert_eq!(cache.get("fp_web"), None);
}

#[wasm_bindgen_test]
fn put_rejects_unknown_currency() {
    let cache = WasmSessionCache::new();
    assert!(cache.put("fp_web", "sec", 1.0, "xyz").is_err());
}
