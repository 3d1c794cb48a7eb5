//! egui texture backing for workflow previews.

use std::collections::HashMap;

use client_core::{PreviewHandle, PreviewSlot, PreviewSurface};
use egui::TextureHandle;
use image::GenericImageView;

const INPUT_PREVIEW_MAX: f32 = 320.0;
const RESULT_PREVIEW_MAX: f32 = 640.0;

pub enum PreviewTexture {
    Image {
        texture: TextureHandle,
        size: egui::Vec2,
    },
    DecodeFailed,
}

/// Decodes published bytes into textures; revoking a handle drops its texture.
pub struct TexturePreviewSurface {
    ctx: egui::Context,
    textures: HashMap<PreviewHandle, PreviewTexture>,
}

impl TexturePreviewSurface {
    pub fn new(ctx: egui::Context) -> Self {
        Self {
            ctx,
            textures: HashMap::new(),
        }
    }

    pub fn get(&self, handle: PreviewHandle) -> Option<&PreviewTexture> {
        self.textures.get(&handle)
    }

    fn decode(&self, handle: PreviewHandle, slot: PreviewSlot, bytes: &[u8]) -> PreviewTexture {
        let decoded = match image::load_from_memory(bytes) {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(handle = handle.id(), "failed to decode preview: {err}");
                return PreviewTexture::DecodeFailed;
            }
        };

        let max_dimension = match slot {
            PreviewSlot::Input(_) => INPUT_PREVIEW_MAX,
            PreviewSlot::Result => RESULT_PREVIEW_MAX,
        };
        let (orig_w, orig_h) = decoded.dimensions();
        let scale = (max_dimension / (orig_w.max(orig_h).max(1) as f32)).min(1.0);
        let resized = if scale < 1.0 {
            decoded.resize(
                (orig_w as f32 * scale).max(1.0) as u32,
                (orig_h as f32 * scale).max(1.0) as u32,
                image::imageops::FilterType::Triangle,
            )
        } else {
            decoded
        };
        let rgba = resized.to_rgba8();
        let [w, h] = [rgba.width() as usize, rgba.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied([w, h], rgba.as_raw());
        let texture = self.ctx.load_texture(
            format!("preview:{}", handle.id()),
            color_image,
            egui::TextureOptions::LINEAR,
        );
        PreviewTexture::Image {
            texture,
            size: egui::vec2(w as f32, h as f32),
        }
    }
}

impl PreviewSurface for TexturePreviewSurface {
    fn publish(&mut self, handle: PreviewHandle, slot: PreviewSlot, bytes: &[u8]) {
        let texture = self.decode(handle, slot, bytes);
        self.textures.insert(handle, texture);
    }

    fn revoke(&mut self, handle: PreviewHandle) {
        self.textures.remove(&handle);
    }
}
