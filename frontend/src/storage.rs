use toledoia_widget_core::VisitorStore;

/// `window.localStorage`, when the browser allows it.
pub struct LocalVisitorStore {
    storage: web_sys::Storage,
}

impl LocalVisitorStore {
    /// `None` when storage is blocked (privacy mode, sandboxed iframe).
    pub fn open() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok()??;
        Some(Self { storage })
    }
}

impl VisitorStore for LocalVisitorStore {
    fn load(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn save(&self, key: &str, value: &str) -> bool {
        self.storage.set_item(key, value).is_ok()
    }
}
