use crate::stokes::Problem;

use futures::channel::oneshot;
use image::{imageops::FilterType, DynamicImage};
use std::path::{Path, PathBuf};
use std::thread;

type Delivery = Result<Vec<u8>, image::ImageError>;

/// An image decoded off the render thread, ready to upload once it lands.
pub struct ImageSource {
    path: PathBuf,
    receiver: oneshot::Receiver<Delivery>,
}

impl ImageSource {
    /// Start decoding `path`, resized to a `size`×`size` field.
    pub fn spawn(path: PathBuf, size: u32) -> Self {
        let (sender, receiver) = oneshot::channel();

        let worker_path = path.clone();
        thread::spawn(move || {
            // The receiver is gone if the simulation shut down first.
            let _ = sender.send(decode_file(&worker_path, size));
        });

        Self { path, receiver }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pixels once the worker is done. `None` while it is still busy.
    pub fn try_receive(&mut self) -> Option<Result<Vec<u8>, Problem>> {
        match self.receiver.try_recv() {
            Ok(None) => None,
            Ok(Some(delivery)) => Some(delivery.map_err(Problem::DecodeImage)),
            Err(oneshot::Canceled) => Some(Err(Problem::ImageWorkerGone)),
        }
    }
}

pub fn decode_file(path: &Path, size: u32) -> Delivery {
    let image = image::open(path)?;
    Ok(fit_to_field(image, size))
}

pub fn decode_bytes(encoded: &[u8], size: u32) -> Delivery {
    let image = image::load_from_memory(encoded)?;
    Ok(fit_to_field(image, size))
}

/// Tightly packed RGBA8 rows, bottom row first.
pub fn fit_to_field(image: DynamicImage, size: u32) -> Vec<u8> {
    image
        .resize_exact(size, size, FilterType::Triangle)
        .flipv()
        .into_rgba8()
        .into_raw()
}
