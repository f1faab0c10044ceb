//! Decoded textures.
//!
//! This module provides [`Texture`], an RGBA8 image kept on the CPU together
//! with the URL it was loaded from. Uploading it to the GPU is the renderer's
//! job.

use anyhow::*;
use image::{ImageFormat, RgbaImage, load_from_memory_with_format};

#[derive(Clone, Debug)]
pub struct Texture {
    pub label: String,
    pub image: RgbaImage,
}

impl Texture {
    /// Decode a texture from raw byte data (image file contents).
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data (PNG, JPEG)
    /// * `label` is used as a debug name, usually the URL
    /// * `format` is an optional file format hint (e.g., "png"). If None, auto-detect.
    pub fn from_bytes(bytes: &[u8], label: &str, format: Option<&str>) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        Ok(Self {
            label: label.to_string(),
            image: img.to_rgba8(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
