//! Browser storage backend for the cart-core storage port.

use cart_core::{Clock, KeyValueStore, MemoryStore, StorageError, StorageResult};
use wasm_bindgen::{JsCast, JsValue};

/// Which Web Storage area to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    /// `window.localStorage`, survives browser restarts
    Local,
    /// `window.sessionStorage`, scoped to the tab
    Session,
}

/// `web_sys::Storage` behind the `KeyValueStore` port
#[derive(Debug, Clone)]
pub struct BrowserStorage {
    storage: web_sys::Storage,
}

impl BrowserStorage {
    pub fn open(area: StorageArea) -> StorageResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window object".to_string()))?;

        let storage = match area {
            StorageArea::Local => window.local_storage(),
            StorageArea::Session => window.session_storage(),
        }
        .map_err(|e| StorageError::AccessDenied(js_error_message(&e)))?
        .ok_or_else(|| StorageError::Unavailable(format!("{:?} storage is disabled", area)))?;

        Ok(Self { storage })
    }
}

fn js_error_name(err: &JsValue) -> Option<String> {
    js_sys::Reflect::get(err, &JsValue::from_str("name"))
        .ok()
        .and_then(|v| v.as_string())
}

fn js_error_message(err: &JsValue) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    err.dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .unwrap_or_else(|| format!("{:?}", err))
}

fn classify(err: JsValue) -> StorageError {
    match js_error_name(&err).as_deref() {
        Some("QuotaExceededError") | Some("NS_ERROR_DOM_QUOTA_REACHED") => {
            StorageError::QuotaExceeded
        }
        Some("SecurityError") => StorageError::AccessDenied(js_error_message(&err)),
        _ => StorageError::Backend(js_error_message(&err)),
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage.get_item(key).map_err(classify)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.storage.set_item(key, value).map_err(classify)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.storage.remove_item(key).map_err(classify)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let len = self.storage.length().map_err(classify)?;
        let mut keys = Vec::with_capacity(len as usize);
        for i in 0..len {
            if let Some(key) = self.storage.key(i).map_err(classify)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// Browser storage when available, otherwise an in-memory map for the
/// lifetime of the page (private browsing, storage disabled).
#[derive(Debug, Clone)]
pub enum PageStorage {
    Browser(BrowserStorage),
    Memory(MemoryStore),
}

impl PageStorage {
    /// Open `area`, falling back to memory when it cannot be opened
    pub fn open_or_memory(area: StorageArea) -> Self {
        match BrowserStorage::open(area) {
            Ok(storage) => PageStorage::Browser(storage),
            Err(e) => {
                crate::warn(&format!("{:?} storage unavailable, using memory: {}", area, e));
                PageStorage::Memory(MemoryStore::new())
            }
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, PageStorage::Browser(_))
    }
}

impl KeyValueStore for PageStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match self {
            PageStorage::Browser(s) => s.get(key),
            PageStorage::Memory(s) => s.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        match self {
            PageStorage::Browser(s) => s.set(key, value),
            PageStorage::Memory(s) => s.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        match self {
            PageStorage::Browser(s) => s.remove(key),
            PageStorage::Memory(s) => s.remove(key),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        match self {
            PageStorage::Browser(s) => s.keys(),
            PageStorage::Memory(s) => s.keys(),
        }
    }
}

/// `Date.now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }
}
