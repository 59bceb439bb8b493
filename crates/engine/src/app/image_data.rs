use std::fmt;
use std::sync::{Arc, OnceLock};

/// Decoded RGBA8 pixels, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl ImageData {
    /// Returns `None` when `rgba` is shorter than `width * height * 4`.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() < expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Shared slot filled at most once by an image loader. Readers poll
/// [`ImageHandle::is_loaded`] and never wait for the decode.
#[derive(Debug, Clone, Default)]
pub struct ImageHandle {
    slot: Arc<OnceLock<ImageData>>,
}

impl ImageHandle {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn ready(image: ImageData) -> Self {
        let handle = Self::default();
        handle.fulfill(image);
        handle
    }

    /// Stores the decoded image. Returns `false` if the slot was already filled.
    pub fn fulfill(&self, image: ImageData) -> bool {
        self.slot.set(image).is_ok()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn get(&self) -> Option<&ImageData> {
        self.slot.get()
    }
}
