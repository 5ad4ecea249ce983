use async_trait::async_trait;
use db::dtos::{ImageSpec, WorkloadRef, WorkloadSpec};
use engine::runtime::{RuntimeClient, RuntimeError};
use std::sync::Mutex;

/// Runtime double recording every request it receives.
#[derive(Default)]
pub struct RecordingRuntime {
    pub image_exists: bool,
    pub calls: Mutex<Vec<RuntimeCall>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    Start(WorkloadRef),
    Stop(WorkloadRef),
    Build(WorkloadRef),
    ImageProbe(String),
}

impl RecordingRuntime {
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stops_for(&self, target: WorkloadRef) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, RuntimeCall::Stop(stopped) if *stopped == target))
            .count()
    }

    pub fn starts(&self) -> Vec<WorkloadRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RuntimeCall::Start(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    pub fn builds(&self) -> Vec<WorkloadRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RuntimeCall::Build(target) => Some(target),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RuntimeClient for RecordingRuntime {
    async fn start(&self, spec: WorkloadSpec) -> Result<(), RuntimeError> {
        self.calls
            .lock()
            .unwrap()
            .push(RuntimeCall::Start(spec.target()));
        Ok(())
    }

    async fn stop(&self, target: WorkloadRef) -> Result<(), RuntimeError> {
        self.calls.lock().unwrap().push(RuntimeCall::Stop(target));
        Ok(())
    }

    async fn build(&self, image: ImageSpec) -> Result<(), RuntimeError> {
        self.calls
            .lock()
            .unwrap()
            .push(RuntimeCall::Build(image.target()));
        Ok(())
    }

    async fn has_image(&self, reference: &str) -> Result<bool, RuntimeError> {
        self.calls
            .lock()
            .unwrap()
            .push(RuntimeCall::ImageProbe(reference.to_string()));
        Ok(self.image_exists)
    }
}
