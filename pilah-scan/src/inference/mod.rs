//! Model loading and inference
//!
//! The model lives in an explicitly owned [`ModelSlot`]. Loading happens on
//! the blocking pool; until it succeeds every [`classify`] call fails with
//! [`ScanError::ModelNotReady`]. A failed first load stays failed until the
//! next [`ModelSlot::load_with`]. Reloading over a working model keeps
//! serving the old one until the replacement is ready, and keeps it if the
//! replacement fails.

#[cfg(feature = "onnx")]
mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

use crate::error::{Result, ScanError};
use crate::preprocess::InputTensor;
use crate::ranking::PredictionSet;

/// A loaded classifier
///
/// `forward` takes `&self`; implementations that need exclusive access to
/// their runtime serialise internally.
pub trait ClassificationModel: Send + Sync {
    /// Identifier for logs and status (usually the artifact path)
    fn name(&self) -> &str;

    /// Run one forward pass and return the raw output vector
    fn forward(&self, input: &InputTensor) -> Result<Vec<f32>>;
}

/// Factory that builds a model; runs on the blocking pool
pub type ModelLoader = Arc<dyn Fn() -> Result<Arc<dyn ClassificationModel>> + Send + Sync>;

/// Loader for the model file at `path`
///
/// Uses ONNX Runtime when built with the `onnx` feature; otherwise every
/// load fails with [`ScanError::ModelLoad`].
pub fn file_loader(path: PathBuf) -> ModelLoader {
    Arc::new(move || {
        #[cfg(feature = "onnx")]
        {
            let model = OnnxModel::load(&path)?;
            Ok(Arc::new(model) as Arc<dyn ClassificationModel>)
        }
        #[cfg(not(feature = "onnx"))]
        {
            Err(ScanError::ModelLoad(format!(
                "cannot load {}: built without the `onnx` feature",
                path.display()
            )))
        }
    })
}

/// Load state reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ModelStatus {
    Pending,
    Ready { model: String },
    Failed { reason: String },
}

enum SlotState {
    Pending,
    Ready(Arc<dyn ClassificationModel>),
    Failed(String),
}

/// Shared handle to the current model
///
/// Cloning shares the same slot.
#[derive(Clone)]
pub struct ModelSlot {
    state: Arc<RwLock<SlotState>>,
    generation: Arc<AtomicU64>,
}

impl Default for ModelSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSlot {
    /// Empty slot in the Pending state
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SlotState::Pending)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Slot that already holds a model
    pub fn ready(model: Arc<dyn ClassificationModel>) -> Self {
        let slot = Self::new();
        slot.set(SlotState::Ready(model));
        slot
    }

    pub fn status(&self) -> ModelStatus {
        match &*self.read() {
            SlotState::Pending => ModelStatus::Pending,
            SlotState::Ready(model) => ModelStatus::Ready {
                model: model.name().to_string(),
            },
            SlotState::Failed(reason) => ModelStatus::Failed {
                reason: reason.clone(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.read(), SlotState::Ready(_))
    }

    /// Current model, if loaded
    ///
    /// # Errors
    /// [`ScanError::ModelNotReady`] while pending or after a failed load.
    pub fn model(&self) -> Result<Arc<dyn ClassificationModel>> {
        match &*self.read() {
            SlotState::Ready(model) => Ok(Arc::clone(model)),
            SlotState::Pending => Err(ScanError::ModelNotReady(
                "model is still loading".to_string(),
            )),
            SlotState::Failed(reason) => Err(ScanError::ModelNotReady(format!(
                "model failed to load: {reason}"
            ))),
        }
    }

    /// Run `loader` on the blocking pool and store its result
    ///
    /// Without a loaded model the slot is Pending while the loader runs and
    /// Failed if it errors. A loaded model stays in service throughout and
    /// is only replaced on success. If another load starts in the meantime,
    /// the older result is discarded.
    pub async fn load_with<F>(&self, loader: F) -> Result<()>
    where
        F: FnOnce() -> Result<Arc<dyn ClassificationModel>> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.write();
            if !matches!(&*state, SlotState::Ready(_)) {
                *state = SlotState::Pending;
            }
        }
        debug!(generation, "Model load started");

        let outcome = match tokio::task::spawn_blocking(loader).await {
            Ok(result) => result,
            Err(e) => Err(ScanError::ModelLoad(format!("loader task failed: {e}"))),
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding superseded model load");
            return outcome.map(|_| ());
        }

        match outcome {
            Ok(model) => {
                info!(model = model.name(), "Model ready");
                self.set(SlotState::Ready(model));
                Ok(())
            }
            Err(e) => {
                let mut state = self.write();
                if let SlotState::Ready(current) = &*state {
                    error!(error = %e, model = current.name(), "Model reload failed, keeping current model");
                } else {
                    error!(error = %e, "Model load failed");
                    *state = SlotState::Failed(e.to_string());
                }
                Err(e)
            }
        }
    }

    fn set(&self, state: SlotState) {
        *self.write() = state;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SlotState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SlotState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Run the model on `tensor` and pair the output with categories
///
/// Consumes the tensor; it is dropped as soon as the forward pass returns,
/// on success and failure alike.
///
/// # Errors
/// - [`ScanError::ModelNotReady`] if the slot holds no model
/// - [`ScanError::InferenceFailure`] if the forward pass fails or yields
///   non-finite / out-of-range scores
/// - [`ScanError::OutputShape`] if the output length is not one score per
///   category
pub async fn classify(tensor: InputTensor, slot: &ModelSlot) -> Result<PredictionSet> {
    let model = slot.model()?;

    let scores = tokio::task::spawn_blocking(move || {
        let scores = model.forward(&tensor);
        drop(tensor);
        scores
    })
    .await
    .map_err(|e| ScanError::InferenceFailure(format!("inference task failed: {e}")))??;

    PredictionSet::from_scores(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::Category;
    use ndarray::Array4;

    struct FixedModel(Vec<f32>);

    impl ClassificationModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn forward(&self, input: &InputTensor) -> Result<Vec<f32>> {
            assert_eq!(input.shape(), &[1, 224, 224, 3]);
            Ok(self.0.clone())
        }
    }

    fn zeros() -> InputTensor {
        InputTensor::from_array(Array4::zeros((1, 224, 224, 3))).unwrap()
    }

    #[tokio::test]
    async fn test_pending_slot_not_ready() {
        let slot = ModelSlot::new();
        assert_eq!(slot.status(), ModelStatus::Pending);
        let err = classify(zeros(), &slot).await.unwrap_err();
        assert!(matches!(err, ScanError::ModelNotReady(_)));
    }

    #[tokio::test]
    async fn test_load_then_classify() {
        let slot = ModelSlot::new();
        slot.load_with(|| {
            let mut scores = vec![0.0; 10];
            scores[Category::Glass.index()] = 1.0;
            Ok(Arc::new(FixedModel(scores)) as Arc<dyn ClassificationModel>)
        })
        .await
        .unwrap();

        assert!(slot.is_ready());
        let set = classify(zeros(), &slot).await.unwrap();
        assert_eq!(set.get(Category::Glass), 1.0);
    }

    #[tokio::test]
    async fn test_failed_load_stays_failed() {
        let slot = ModelSlot::new();
        let result = slot
            .load_with(|| Err(ScanError::ModelLoad("missing file".to_string())))
            .await;
        assert!(result.is_err());
        assert!(matches!(slot.status(), ModelStatus::Failed { .. }));
        assert!(matches!(
            classify(zeros(), &slot).await,
            Err(ScanError::ModelNotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_working_model() {
        let slot = ModelSlot::ready(Arc::new(FixedModel(vec![0.1; 10])));
        let result = slot
            .load_with(|| Err(ScanError::ModelLoad("corrupt artifact".to_string())))
            .await;

        assert!(result.is_err());
        assert_eq!(
            slot.status(),
            ModelStatus::Ready {
                model: "fixed".to_string()
            }
        );
        assert!(classify(zeros(), &slot).await.is_ok());
    }

    #[tokio::test]
    async fn test_reload_serves_old_model_meanwhile() {
        let slot = ModelSlot::ready(Arc::new(FixedModel(vec![0.1; 10])));
        let (release, wait) = std::sync::mpsc::channel::<()>();

        let reloading = {
            let slot = slot.clone();
            tokio::spawn(async move {
                slot.load_with(move || {
                    let _ = wait.recv();
                    Ok(Arc::new(FixedModel(vec![0.0; 10])) as Arc<dyn ClassificationModel>)
                })
                .await
            })
        };
        tokio::task::yield_now().await;

        // Still answering with the old model while the new one loads
        let set = classify(zeros(), &slot).await.unwrap();
        assert_eq!(set.get(Category::Battery), 0.1);

        release.send(()).unwrap();
        reloading.await.unwrap().unwrap();
        let set = classify(zeros(), &slot).await.unwrap();
        assert_eq!(set.get(Category::Battery), 0.0);
    }

    #[tokio::test]
    async fn test_wrong_output_length() {
        let slot = ModelSlot::ready(Arc::new(FixedModel(vec![0.1; 12])));
        let err = classify(zeros(), &slot).await.unwrap_err();
        assert!(matches!(
            err,
            ScanError::OutputShape {
                expected: 10,
                actual: 12
            }
        ));
    }

    #[tokio::test]
    async fn test_file_loader_missing_file_fails() {
        let slot = ModelSlot::new();
        let loader = file_loader(PathBuf::from("/nonexistent/pilah/model.onnx"));
        let err = slot.load_with(move || loader()).await.unwrap_err();
        assert!(matches!(err, ScanError::ModelLoad(_)));
        assert!(matches!(slot.status(), ModelStatus::Failed { .. }));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(ModelStatus::Ready {
            model: "m.onnx".to_string(),
        })
        .unwrap();
        assert_eq!(json["state"], "ready");
        assert_eq!(json["model"], "m.onnx");
    }
}
