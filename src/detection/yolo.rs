use std::path::Path;

use anyhow::Context;
use image::RgbImage;
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;

use super::CariesDetector;
use super::annotate::annotate;
use super::postprocess::{YoloParams, decode_output, letterbox, to_chw};
use crate::models::FrameResult;

/// YOLO detection model converted to `.rten`, run on the CPU.
pub struct RtenYoloDetector {
    model: Model,
    params: YoloParams,
    class_names: Vec<String>,
}

impl RtenYoloDetector {
    /// Load model weights from disk. Fails if the file is missing or is not a
    /// valid model, so callers can abort before any UI is shown.
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        class_names: Vec<String>,
        params: YoloParams,
    ) -> anyhow::Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.is_file() {
            anyhow::bail!(
                "Detection model not found at {}.\n\
                 Pass --model <PATH> or set CARIES_MODEL to a converted .rten model.",
                model_path.display()
            );
        }
        if class_names.is_empty() {
            anyhow::bail!("At least one class name is required");
        }

        let model = Model::load_file(model_path)
            .with_context(|| format!("Failed to load detection model {}", model_path.display()))?;
        log::info!(
            "Loaded detection model {} ({} classes, input {}px)",
            model_path.display(),
            class_names.len(),
            params.input_size
        );

        Ok(Self {
            model,
            params,
            class_names,
        })
    }
}

impl CariesDetector for RtenYoloDetector {
    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<FrameResult> {
        let size = self.params.input_size as usize;
        let (input_image, lb) = letterbox(frame, self.params.input_size);
        let input = NdTensor::from_data([1, 3, size, size], to_chw(&input_image));

        let output: NdTensor<f32, 3> = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| anyhow::anyhow!("Model inference failed: {:?}", e))?
            .try_into()
            .map_err(|e| anyhow::anyhow!("Unexpected model output: {:?}", e))?;

        let [_, rows, anchors] = output.shape();
        let data = output.to_vec();
        let detections = decode_output(&data, rows, anchors, &self.params, &lb)?;
        log::trace!("Frame produced {} detections", detections.len());

        let annotated = annotate(frame, &detections, &self.class_names);
        Ok(FrameResult {
            detections,
            annotated,
        })
    }
}
