use super::loader::{self, LoadError, LoadedModel};
use super::{Blob, ModelFormat, ObjectUrl};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Result of one background decode, tagged with the request generation.
#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: u64,
    pub url: ObjectUrl,
    pub result: Result<LoadedModel, LoadError>,
}

/// Decodes models off the UI thread, one thread per request. Only the most
/// recent request is current; older results are still delivered and the
/// caller discards them by generation.
pub struct AssetLoader {
    result_sender: Sender<LoadOutcome>,
    result_receiver: Receiver<LoadOutcome>,
    generation: u64,
}

impl AssetLoader {
    pub fn new() -> Self {
        let (result_sender, result_receiver) = mpsc::channel();
        Self {
            result_sender,
            result_receiver,
            generation: 0,
        }
    }

    pub fn latest_generation(&self) -> u64 {
        self.generation
    }

    pub fn request(&mut self, url: ObjectUrl, format: ModelFormat, blob: Blob) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        let sender = self.result_sender.clone();
        let worker_url = url.clone();
        let spawned = thread::Builder::new()
            .name(format!("model-load-{}", generation))
            .spawn(move || {
                let started = std::time::Instant::now();
                let result = decode_guarded(|| loader::decode(format, &blob));
                log::debug!(
                    "Decoded {} in {:.1} ms (generation {})",
                    worker_url,
                    started.elapsed().as_secs_f64() * 1000.0,
                    generation
                );
                // Receiver gone means the app is shutting down.
                let _ = sender.send(LoadOutcome {
                    generation,
                    url: worker_url,
                    result,
                });
            });
        if let Err(err) = spawned {
            log::error!("Failed to start loader thread: {}", err);
            let _ = self.result_sender.send(LoadOutcome {
                generation,
                url,
                result: Err(LoadError::WorkerLost),
            });
        }
        generation
    }

    /// Drain finished loads without blocking.
    pub fn poll(&self) -> Vec<LoadOutcome> {
        self.result_receiver.try_iter().collect()
    }

    /// Outcome for the latest request, dropping anything older.
    pub fn poll_latest(&self) -> Option<LoadOutcome> {
        let latest = self.generation;
        self.poll().into_iter().fold(None, |kept, outcome| {
            if outcome.generation == latest {
                Some(outcome)
            } else {
                log::debug!(
                    "Discarding superseded load of {} (generation {} < {})",
                    outcome.url,
                    outcome.generation,
                    latest
                );
                kept
            }
        })
    }
}

/// Run a decode, turning a panic into [`LoadError::WorkerLost`] so the
/// request still gets an answer.
fn decode_guarded<F>(decode: F) -> Result<LoadedModel, LoadError>
where
    F: FnOnce() -> Result<LoadedModel, LoadError>,
{
    panic::catch_unwind(AssertUnwindSafe(decode)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("Model decoder panicked: {}", reason);
        Err(LoadError::WorkerLost)
    })
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::loader::tests::{quad_obj, triangle_glb};
    use crate::assets::BlobStore;
    use std::time::{Duration, Instant};

    fn wait_for(loader: &AssetLoader, count: usize) -> Vec<LoadOutcome> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut outcomes = Vec::new();
        while outcomes.len() < count && Instant::now() < deadline {
            outcomes.extend(loader.poll());
            thread::sleep(Duration::from_millis(5));
        }
        outcomes
    }

    #[test]
    fn generations_increase_per_request() {
        let mut blobs = BlobStore::new();
        let mut loader = AssetLoader::new();
        let url = blobs.create_object_url(triangle_glb().into(), None);
        let blob = blobs.resolve(&url).unwrap();
        let first = loader.request(url.clone(), ModelFormat::Glb, blob.clone());
        let second = loader.request(url, ModelFormat::Glb, blob);
        assert!(second > first);
        assert_eq!(loader.latest_generation(), second);

        let outcomes = wait_for(&loader, 2);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }

    #[test]
    fn latest_poll_discards_superseded_results() {
        let mut blobs = BlobStore::new();
        let mut loader = AssetLoader::new();
        let glb = blobs.create_object_url(triangle_glb().into(), None);
        let obj = blobs.create_object_url(quad_obj().to_vec().into(), None);
        loader.request(glb.clone(), ModelFormat::Glb, blobs.resolve(&glb).unwrap());
        let latest = loader.request(obj.clone(), ModelFormat::Obj, blobs.resolve(&obj).unwrap());

        // Let both threads finish before polling once.
        thread::sleep(Duration::from_millis(200));
        let deadline = Instant::now() + Duration::from_secs(10);
        let outcome = loop {
            if let Some(outcome) = loader.poll_latest() {
                break outcome;
            }
            assert!(Instant::now() < deadline, "load never finished");
            thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(outcome.generation, latest);
        assert_eq!(outcome.url, obj);
    }

    #[test]
    fn panicking_decode_reports_worker_lost() {
        let result = decode_guarded(|| panic!("accessor out of range"));
        assert!(matches!(result, Err(LoadError::WorkerLost)));
    }

    #[test]
    fn decode_errors_are_delivered() {
        let mut blobs = BlobStore::new();
        let mut loader = AssetLoader::new();
        let url = blobs.create_object_url(b"garbage".to_vec().into(), None);
        loader.request(url.clone(), ModelFormat::Gltf, blobs.resolve(&url).unwrap());
        let outcomes = wait_for(&loader, 1);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_err());
    }
}
