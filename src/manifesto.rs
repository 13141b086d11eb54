//! The manifesto's signature flag and typewriter reveal.
//!
//! Signing is remembered in `localStorage` on this device only. Storage is
//! best effort: a browser with storage disabled simply forgets the signature.

use std::collections::HashMap;

use wasm_bindgen::prelude::*;
use web_sys::{Storage, window};

pub const SIGNED_KEY: &str = "dawn_manifesto_signed";
/// Displayed signature count before this visitor signs.
pub const BASE_SIGNATURES: u32 = 14892;
pub const LINE_INTERVAL_MS: f64 = 800.0;

pub const MANIFESTO_TEXT: [&str; 8] = [
    "我们拒绝成为分数的奴隶。",
    "我们拒绝用健康换取毫无意义的排名。",
    "在这台巨大的绞肉机停止转动之前，",
    "我们发誓：",
    "哪怕在深夜，也要仰望星空。",
    "哪怕被压弯，决不被折断。",
    "我不止是一个学号，我是鲜活的生命。",
    "活着，清醒地活着，就是最大的反抗。",
];

pub trait FlagStore {
    fn read(&self, key: &str) -> Option<String>;
    /// Returns false when the value could not be stored.
    fn write(&mut self, key: &str, value: &str) -> bool;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> bool {
        self.entries.insert(key.to_owned(), value.to_owned());
        true
    }
}

/// `window.localStorage`, if the browser grants it.
pub struct BrowserStore {
    storage: Option<Storage>,
}

impl BrowserStore {
    pub fn open() -> Self {
        let storage = window().and_then(|w| w.local_storage().ok().flatten());
        if storage.is_none() {
            tracing::warn!("localStorage unavailable; signature will not persist");
        }
        Self { storage }
    }
}

impl FlagStore for BrowserStore {
    fn read(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn write(&mut self, key: &str, value: &str) -> bool {
        let Some(storage) = self.storage.as_ref() else {
            return false;
        };
        match storage.set_item(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("failed to persist {}: {:?}", key, e);
                false
            }
        }
    }
}

pub struct Manifesto<S> {
    store: S,
    signed: bool,
    count: u32,
}

impl<S: FlagStore> Manifesto<S> {
    pub fn load(store: S) -> Self {
        // Any stored value counts as signed.
        let signed = store.read(SIGNED_KEY).is_some_and(|v| !v.is_empty());
        let count = BASE_SIGNATURES + u32::from(signed);
        Self { store, signed, count }
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Sign once. Returns true only on the first signature.
    pub fn sign(&mut self) -> bool {
        if self.signed {
            return false;
        }
        self.signed = true;
        self.count += 1;
        if !self.store.write(SIGNED_KEY, "true") {
            tracing::debug!("signature kept for this page only");
        }
        true
    }

    /// Lines revealed `elapsed_ms` after the section appeared.
    pub fn visible_lines(&self, elapsed_ms: f64) -> usize {
        if self.signed {
            return MANIFESTO_TEXT.len();
        }
        let shown = (elapsed_ms.max(0.0) / LINE_INTERVAL_MS).floor() as usize;
        shown.min(MANIFESTO_TEXT.len())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[wasm_bindgen]
pub fn manifesto_signed() -> bool {
    Manifesto::load(BrowserStore::open()).is_signed()
}

/// Sign the manifesto on this device. Returns true on a fresh signature.
#[wasm_bindgen]
pub fn sign_manifesto() -> bool {
    let mut manifesto = Manifesto::load(BrowserStore::open());
    let fresh = manifesto.sign();
    if fresh {
        if let Some(w) = window() {
            let nav = w.navigator();
            if js_sys::Reflect::has(&nav, &JsValue::from_str("vibrate")).unwrap_or(false) {
                nav.vibrate_with_duration(50);
            }
        }
        tracing::info!(count = manifesto.count(), "manifesto signed");
    }
    fresh
}

#[wasm_bindgen]
pub fn manifesto_signature_count() -> u32 {
    Manifesto::load(BrowserStore::open()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_visitor_signs_once() {
        let mut m = Manifesto::load(MemoryStore::new());
        assert!(!m.is_signed());
        assert_eq!(m.count(), BASE_SIGNATURES);
        assert!(m.sign());
        assert!(!m.sign());
        assert_eq!(m.count(), BASE_SIGNATURES + 1);
        assert_eq!(m.store().read(SIGNED_KEY).as_deref(), Some("true"));
    }

    #[test]
    fn stored_flag_survives_reload() {
        let mut store = MemoryStore::new();
        store.write(SIGNED_KEY, "true");
        let m = Manifesto::load(store);
        assert!(m.is_signed());
        assert_eq!(m.count(), BASE_SIGNATURES + 1);
        assert_eq!(m.visible_lines(0.0), MANIFESTO_TEXT.len());
    }

    #[test]
    fn lines_appear_every_interval() {
        let m = Manifesto::load(MemoryStore::new());
        assert_eq!(m.visible_lines(0.0), 0);
        assert_eq!(m.visible_lines(799.0), 0);
        assert_eq!(m.visible_lines(800.0), 1);
        assert_eq!(m.visible_lines(2_500.0), 3);
        assert_eq!(m.visible_lines(60_000.0), MANIFESTO_TEXT.len());
        assert_eq!(m.visible_lines(-5.0), 0);
    }

    struct ReadOnly;

    impl FlagStore for ReadOnly {
        fn read(&self, _key: &str) -> Option<String> {
            None
        }
        fn write(&mut self, _key: &str, _value: &str) -> bool {
            false
        }
    }

    #[test]
    fn failed_write_still_signs_for_this_page() {
        let mut m = Manifesto::load(ReadOnly);
        assert!(m.sign());
        assert!(m.is_signed());
    }
}
