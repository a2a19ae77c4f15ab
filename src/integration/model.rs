//! Active detection model and hot reload.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::integration::InferenceModel;

/// Variant loaded when a requested one fails.
pub const DEFAULT_MODEL_VARIANT: &str = "yolov8n";

/// Loads a detection model by variant name.
pub trait ModelLoader: Send + Sync {
    fn load(&self, variant: &str) -> Result<Arc<dyn InferenceModel>>;
}

impl<F> ModelLoader for F
where
    F: Fn(&str) -> Result<Arc<dyn InferenceModel>> + Send + Sync,
{
    fn load(&self, variant: &str) -> Result<Arc<dyn InferenceModel>> {
        self(variant)
    }
}

/// Shared slot holding the active model.
///
/// Readers clone the inner `Arc` and run inference without holding the lock,
/// so a swap never waits on a running frame and in-flight frames finish on
/// the model they started with. Reloads are serialised among themselves.
pub struct ModelHandle {
    loader: Option<Box<dyn ModelLoader>>,
    default_variant: String,
    active: RwLock<Option<Arc<dyn InferenceModel>>>,
    reload_lock: Mutex<()>,
    loading: AtomicBool,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("has_loader", &self.has_loader())
            .field("default_variant", &self.default_variant)
            .field("active_variant", &self.active_variant())
            .field("loading", &self.is_loading())
            .finish()
    }
}

impl ModelHandle {
    /// Empty handle using `loader` for every (re)load.
    pub fn new<L: ModelLoader + 'static>(loader: L) -> Self {
        Self::from_boxed(Box::new(loader))
    }

    pub fn from_boxed(loader: Box<dyn ModelLoader>) -> Self {
        Self::with_loader(Some(loader))
    }

    /// Handle with no loader: every load fails and detection yields nothing.
    pub fn unloaded() -> Self {
        Self::with_loader(None)
    }

    fn with_loader(loader: Option<Box<dyn ModelLoader>>) -> Self {
        Self {
            loader,
            default_variant: DEFAULT_MODEL_VARIANT.to_string(),
            active: RwLock::new(None),
            reload_lock: Mutex::new(()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }

    pub fn with_default_variant(mut self, variant: impl Into<String>) -> Self {
        self.default_variant = variant.into();
        self
    }

    /// Snapshot of the active model, if any.
    pub fn current(&self) -> Option<Arc<dyn InferenceModel>> {
        self.active.read().clone()
    }

    /// Variant of the model actually loaded.
    pub fn active_variant(&self) -> Option<String> {
        self.active.read().as_ref().map(|m| m.variant().to_string())
    }

    pub fn default_variant(&self) -> &str {
        &self.default_variant
    }

    /// True while a reload is in progress.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Replace the active model with `variant`.
    ///
    /// On failure the default variant is tried instead and the original
    /// `ModelLoad` error is still returned. When the default fails as well,
    /// the previously active model stays in place.
    pub fn reload(&self, variant: &str) -> Result<()> {
        self.reload_with(|| variant.to_string())
    }

    /// Same as [`reload`](Self::reload), but `variant` is evaluated only once
    /// this call holds the reload lock. Reloads queued behind each other then
    /// all load whatever the closure names at the time they run.
    pub fn reload_with<F: FnOnce() -> String>(&self, variant: F) -> Result<()> {
        let Some(loader) = &self.loader else {
            let err = Error::model_load(variant(), "no model loader configured");
            log::warn!("{err}");
            return Err(err);
        };
        let _serial = self.reload_lock.lock();
        let _loading = LoadingFlag::raise(&self.loading);
        let variant = variant();
        let variant = variant.as_str();

        let err = match loader.load(variant) {
            Ok(model) => {
                self.swap(model);
                log::info!("model `{variant}` loaded");
                return Ok(());
            }
            Err(e) => as_load_error(variant, e),
        };
        log::warn!("{err}; falling back to `{}`", self.default_variant);

        if variant != self.default_variant {
            match loader.load(&self.default_variant) {
                Ok(model) => {
                    self.swap(model);
                    log::info!("fallback model `{}` loaded", self.default_variant);
                    return Err(err);
                }
                Err(e) => log::error!("{}", as_load_error(&self.default_variant, e)),
            }
        }

        match self.active_variant() {
            Some(previous) => log::warn!("keeping previous model `{previous}`"),
            None => log::warn!("no model loaded; detection will return no boxes"),
        }
        Err(err)
    }

    fn swap(&self, model: Arc<dyn InferenceModel>) {
        let previous = self.active.write().replace(model);
        // Dropped outside the lock; in-flight frames may still hold it.
        drop(previous);
    }
}

fn as_load_error(variant: &str, err: Error) -> Error {
    match err {
        Error::ModelLoad { .. } => err,
        other => Error::model_load(variant, other.to_string()),
    }
}

/// Holds the `loading` flag up until dropped.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::{Frame, RawDetection};

    struct Named(String);

    impl InferenceModel for Named {
        fn variant(&self) -> &str {
            &self.0
        }

        fn infer(&self, _frame: &Frame) -> Result<Vec<RawDetection>> {
            Ok(Vec::new())
        }
    }

    fn loader(valid: &'static [&'static str]) -> impl ModelLoader {
        move |variant: &str| -> Result<Arc<dyn InferenceModel>> {
            if valid.contains(&variant) {
                Ok(Arc::new(Named(variant.to_string())))
            } else {
                Err(Error::model_load(variant, "unknown weights"))
            }
        }
    }

    #[test]
    fn test_reload_swaps_model() {
        let handle = ModelHandle::new(loader(&["yolov8n", "yolov8s"]));
        assert!(handle.current().is_none());

        handle.reload("yolov8s").unwrap();
        assert_eq!(handle.active_variant().as_deref(), Some("yolov8s"));
        assert!(!handle.is_loading());
    }

    #[test]
    fn test_failed_reload_falls_back_to_default() {
        let handle = ModelHandle::new(loader(&["yolov8n", "yolov8s"]));
        handle.reload("yolov8s").unwrap();

        let err = handle.reload("missing").unwrap_err();
        assert_eq!(err, Error::model_load("missing", "unknown weights"));
        assert_eq!(handle.active_variant().as_deref(), Some("yolov8n"));
    }

    #[test]
    fn test_previous_model_kept_when_default_fails() {
        let handle = ModelHandle::new(loader(&["yolov8s"]));
        handle.reload("yolov8s").unwrap();

        assert!(handle.reload("missing").is_err());
        assert_eq!(handle.active_variant().as_deref(), Some("yolov8s"));
    }

    #[test]
    fn test_inflight_snapshot_survives_swap() {
        let handle = ModelHandle::new(loader(&["yolov8n", "yolov8s"]));
        handle.reload("yolov8n").unwrap();
        let in_flight = handle.current().unwrap();

        handle.reload("yolov8s").unwrap();
        assert_eq!(in_flight.variant(), "yolov8n");
        assert_eq!(handle.active_variant().as_deref(), Some("yolov8s"));
    }

    #[test]
    fn test_reload_with_reads_variant_under_lock() {
        let handle = ModelHandle::new(loader(&["yolov8n", "yolov8s"]));
        let mut asked = None;
        handle
            .reload_with(|| {
                asked = Some(handle.is_loading());
                "yolov8s".to_string()
            })
            .unwrap();
        assert_eq!(asked, Some(true));
        assert_eq!(handle.active_variant().as_deref(), Some("yolov8s"));
    }

    #[test]
    fn test_unloaded_handle() {
        let handle = ModelHandle::unloaded().with_default_variant("tiny");
        assert_eq!(handle.default_variant(), "tiny");
        assert!(matches!(
            handle.reload("yolov8s"),
            Err(Error::ModelLoad { .. })
        ));
        assert!(handle.current().is_none());
    }
}
