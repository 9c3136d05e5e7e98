//! Example showing a create-then-wait flow against a simulated API

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tfwait::{Context, Probe, ProbeError, WaitSpec};

// Pretend cloud API: the volume becomes "available" after a few reads
#[derive(Clone)]
struct VolumeApi {
    reads: Arc<AtomicU32>,
}

impl VolumeApi {
    fn new() -> Self {
        Self {
            reads: Arc::new(AtomicU32::new(0)),
        }
    }

    async fn create_volume(&self, name: &str) -> String {
        tokio::time::sleep(Duration::from_millis(50)).await;
        println!("Creating volume '{}'", name);
        format!("vol-{}", name)
    }

    async fn describe_volume(&self, id: &str) -> Result<Option<String>, ProbeError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        let status = match read {
            0 => return Ok(None),
            1..=3 => "creating",
            _ => "available",
        };
        println!("Volume '{}' is {}", id, status);
        Ok(Some(status.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let api = VolumeApi::new();
    let id = api.create_volume("data").await;

    let ctx = Context::new().with_timeout(Duration::from_secs(30));
    let spec = WaitSpec::new(Duration::from_secs(10))
        .with_pending(["creating"])
        .with_target(["available"])
        .with_failure(["error"]);

    let outcome = spec
        .wait(&ctx, || async {
            // freshly created volumes can be invisible for a moment
            Ok::<_, ProbeError>(match api.describe_volume(&id).await? {
                Some(status) => Probe::found(id.clone(), status),
                None => Probe::NotFound,
            })
        })
        .await?;

    println!(
        "Volume {} reached '{}' after {} probes in {:?}",
        id,
        outcome.state.as_deref().unwrap_or(""),
        outcome.probes,
        outcome.elapsed
    );

    Ok(())
}
