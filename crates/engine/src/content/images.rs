use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use image::{ImageError, ImageReader};
use thiserror::Error;
use tracing::{info, warn};

use crate::app::{ImageData, ImageHandle};
use crate::asset_keys::validate_asset_key;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("decoded image {path} has inconsistent dimensions")]
    Dimensions { path: PathBuf },
}

pub fn load_image(path: &Path) -> Result<ImageData, ImageLoadError> {
    let decoded = ImageReader::open(path)
        .map_err(|source| ImageLoadError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| ImageLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (width, height) = decoded.dimensions();
    ImageData::new(width, height, decoded.into_raw()).ok_or_else(|| ImageLoadError::Dimensions {
        path: path.to_path_buf(),
    })
}

struct LoadJob {
    key: String,
    path: PathBuf,
    handle: ImageHandle,
}

/// Decodes PNG sprites on a background thread. Callers get a handle
/// immediately and poll `is_loaded()`; a failed load leaves the handle
/// pending so the sprite simply never draws.
pub struct ImageLoader {
    sprites_dir: PathBuf,
    handles: HashMap<String, ImageHandle>,
    jobs: Option<Sender<LoadJob>>,
    worker: Option<JoinHandle<()>>,
}

impl ImageLoader {
    pub fn spawn(sprites_dir: PathBuf) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<LoadJob>();
        let worker = thread::Builder::new()
            .name("image-loader".to_string())
            .spawn(move || {
                for job in receiver {
                    match load_image(&job.path) {
                        Ok(image) => {
                            info!(
                                key = job.key.as_str(),
                                width = image.width(),
                                height = image.height(),
                                "image_loaded"
                            );
                            job.handle.fulfill(image);
                        }
                        Err(error) => {
                            warn!(key = job.key.as_str(), error = %error, "image_load_failed");
                        }
                    }
                }
            })?;
        Ok(Self {
            sprites_dir,
            handles: HashMap::new(),
            jobs: Some(sender),
            worker: Some(worker),
        })
    }

    /// Returns the shared handle for `key`, queueing a load on first request.
    pub fn request(&mut self, key: &str) -> ImageHandle {
        if let Some(handle) = self.handles.get(key) {
            return handle.clone();
        }

        let handle = ImageHandle::pending();
        self.handles.insert(key.to_string(), handle.clone());

        if let Err(error) = validate_asset_key(key) {
            warn!(key, error = %error, "image_key_invalid");
            return handle;
        }
        let job = LoadJob {
            key: key.to_string(),
            path: self.sprites_dir.join(format!("{key}.png")),
            handle: handle.clone(),
        };
        let queued = self
            .jobs
            .as_ref()
            .is_some_and(|jobs| jobs.send(job).is_ok());
        if !queued {
            warn!(key, "image_loader_stopped");
        }
        handle
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        self.jobs = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("image_loader_thread_panicked");
            }
        }
    }
}
