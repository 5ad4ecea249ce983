use async_nats::jetstream;
use async_trait::async_trait;
use db::dtos::{ImageSpec, WorkloadRef, WorkloadSpec};
use serde::{Deserialize, Serialize};

pub static JETSTREAM_NAME: &str = "WORKLOADS";

/// Client half of the container-runtime interface. The control plane only
/// ever issues requests through this trait; it never observes containers
/// directly, so every method is a fire-level acknowledgement rather than a
/// completion signal.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    async fn start(&self, spec: WorkloadSpec) -> Result<(), RuntimeError>;

    /// Must be safe to call on an already-stopped target.
    async fn stop(&self, target: WorkloadRef) -> Result<(), RuntimeError>;

    async fn build(&self, image: ImageSpec) -> Result<(), RuntimeError>;

    /// Whether the runtime already holds an image for `reference`.
    async fn has_image(&self, reference: &str) -> Result<bool, RuntimeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime request failed: {0}")]
    Transport(String),
    #[error("malformed runtime reply")]
    MalformedReply(#[from] serde_json::Error),
}

/// Runtime client backed by NATS: workload and build commands go through a
/// JetStream work queue so they survive a runtime-side restart, while image
/// probes use plain request/reply.
pub struct NatsRuntimeClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

#[derive(Serialize)]
struct ImageExistsRequest<'a> {
    reference: &'a str,
}

#[derive(Deserialize)]
struct ImageExistsReply {
    exists: bool,
}

impl NatsRuntimeClient {
    /// Wraps an established connection and makes sure the workload stream
    /// exists before anything gets published to it.
    pub async fn connect(client: async_nats::Client) -> Result<Self, RuntimeError> {
        let jetstream = jetstream::new(client.clone());
        jetstream
            .get_or_create_stream(jetstream::stream::Config {
                name: JETSTREAM_NAME.to_string(),
                subjects: vec!["workload.>".to_string(), "image.build".to_string()],
                retention: jetstream::stream::RetentionPolicy::WorkQueue,
                ..Default::default()
            })
            .await
            .map_err(|error| RuntimeError::Transport(error.to_string()))?;

        Ok(Self { client, jetstream })
    }

    async fn publish<T: Serialize>(
        &self,
        subject: &'static str,
        payload: &T,
    ) -> Result<(), RuntimeError> {
        let payload = serde_json::to_vec(payload)?;
        self.jetstream
            .publish(subject, payload.into())
            .await
            .map_err(|error| RuntimeError::Transport(error.to_string()))?
            .await
            .map_err(|error| RuntimeError::Transport(error.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl RuntimeClient for NatsRuntimeClient {
    async fn start(&self, spec: WorkloadSpec) -> Result<(), RuntimeError> {
        self.publish("workload.start", &spec).await
    }

    async fn stop(&self, target: WorkloadRef) -> Result<(), RuntimeError> {
        self.publish("workload.stop", &target).await
    }

    async fn build(&self, image: ImageSpec) -> Result<(), RuntimeError> {
        self.publish("image.build", &image).await
    }

    async fn has_image(&self, reference: &str) -> Result<bool, RuntimeError> {
        let request = serde_json::to_vec(&ImageExistsRequest { reference })?;
        let reply = self
            .client
            .request("image.exists", request.into())
            .await
            .map_err(|error| RuntimeError::Transport(error.to_string()))?;
        let reply: ImageExistsReply = serde_json::from_slice(&reply.payload)?;
        Ok(reply.exists)
    }
}
