//! Preview module - Thumbnails and image export from detected files
//!
//! Picks the best internal image a parser offers, scales it, and writes
//! PNG. Pixel-art icons are scaled with nearest-neighbour.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};
use parking_lot::RwLock;
use rayon::prelude::*;

use crate::factory::RomDataFactory;
use crate::romdata::{ImageFlags, ImageType, RomData, RomDataAttrs};

/// Internal image types, best thumbnail candidate first.
pub const THUMBNAIL_PRIORITY: [ImageType; 4] = [
    ImageType::IntIcon,
    ImageType::IntBanner,
    ImageType::IntImage,
    ImageType::IntMedia,
];

/// Cache for scaled thumbnails
type ThumbnailCache = Arc<RwLock<HashMap<String, Arc<RgbaImage>>>>;

/// First internal image `rd` can produce, in [`THUMBNAIL_PRIORITY`] order.
pub fn pick_image(rd: &dyn RomData) -> Option<(ImageType, Arc<RgbaImage>)> {
    THUMBNAIL_PRIORITY
        .into_iter()
        .find_map(|t| rd.image(t).map(|img| (t, img)))
}

/// Thumbnail generator with an in-memory cache
#[derive(Clone, Default)]
pub struct Thumbnailer {
    cache: ThumbnailCache,
}

impl Thumbnailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scaled thumbnail of the best internal image of `rd`.
    ///
    /// `size` is the longest edge. Results are cached per file and size.
    pub fn thumbnail(&self, rd: &dyn RomData, size: u32) -> Result<Arc<RgbaImage>> {
        let key = rd
            .base()
            .file()
            .and_then(|f| f.filename().map(|name| self.cache_key(name, size)));

        if let Some(key) = &key {
            if let Some(cached) = self.cache.read().get(key) {
                return Ok(cached.clone());
            }
        }

        let (image_type, img) =
            pick_image(rd).ok_or_else(|| anyhow!("{} has no internal image", rd.class_name()))?;
        let nearest = rd.image_flags(image_type).contains(ImageFlags::RESCALE_NEAREST);
        let thumb = Arc::new(resize_image(&img, size, nearest));

        if let Some(key) = key {
            self.cache.write().insert(key, thumb.clone());
        }
        Ok(thumb)
    }

    /// Detect `source`, render its thumbnail, and write it to `dest` as PNG.
    pub fn generate(&self, source: &Path, dest: &Path, size: u32) -> Result<PathBuf> {
        let rd = RomDataFactory::create_from_path(source, RomDataAttrs::HAS_THUMBNAIL)
            .with_context(|| format!("Failed to open: {}", source.display()))?
            .ok_or_else(|| anyhow!("unsupported format: {}", source.display()))?;

        let thumb = self.thumbnail(rd.as_ref(), size)?;
        save_png(&thumb, dest)?;
        Ok(dest.to_path_buf())
    }

    /// Generate thumbnails for a batch of files in parallel using rayon
    ///
    /// Each thumbnail is written to `out_dir` as `<file stem>.png`.
    /// Returns one Result per input path.
    pub fn generate_batch(&self, sources: &[PathBuf], out_dir: &Path, size: u32) -> Vec<Result<PathBuf>> {
        sources
            .par_iter()
            .map(|source| {
                let stem = source
                    .file_stem()
                    .ok_or_else(|| anyhow!("no file name: {}", source.display()))?;
                let dest = out_dir.join(stem).with_extension("png");
                self.generate(source, &dest, size)
            })
            .collect()
    }

    /// Number of cached thumbnails
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }

    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Generate cache key for a source name and size
    fn cache_key(&self, name: &str, size: u32) -> String {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        format!("{}-{}", hex::encode(hasher.finish().to_be_bytes()), size)
    }
}

/// Resize to fit `max_size`, keeping the aspect ratio.
pub fn resize_image(img: &RgbaImage, max_size: u32, nearest: bool) -> RgbaImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 || max_size == 0 {
        return img.clone();
    }

    let (new_width, new_height) = if width > height {
        let ratio = max_size as f32 / width as f32;
        (max_size, ((height as f32 * ratio) as u32).max(1))
    } else {
        let ratio = max_size as f32 / height as f32;
        (((width as f32 * ratio) as u32).max(1), max_size)
    };

    let filter = if nearest { FilterType::Nearest } else { FilterType::Lanczos3 };
    image::imageops::resize(img, new_width, new_height, filter)
}

/// Write an image as PNG, creating parent directories.
pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write image: {}", path.display()))
}

/// Write one internal image of `rd` unscaled.
pub fn extract_image(rd: &dyn RomData, image_type: ImageType, dest: &Path) -> Result<()> {
    if !image_type.is_internal() {
        return Err(anyhow!("{} is not an internal image type", image_type.name()));
    }
    let img = rd
        .image(image_type)
        .ok_or_else(|| anyhow!("{} has no {} image", rd.class_name(), image_type.name()))?;
    save_png(&img, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::formats::n3ds_smdh::tests::make_smdh;
    use crate::formats::{Nintendo3dsSmdh, Nsf};
    use crate::romdata::RomDataClass;
    use image::Rgba;

    #[test]
    fn test_resize_keeps_aspect() {
        let img = RgbaImage::new(64, 32);
        let out = resize_image(&img, 128, true);
        assert_eq!(out.dimensions(), (128, 64));

        let tall = RgbaImage::new(10, 40);
        assert_eq!(resize_image(&tall, 20, false).dimensions(), (5, 20));
    }

    #[test]
    fn test_nearest_keeps_hard_edges() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        let out = resize_image(&img, 8, true);
        assert_eq!(out.get_pixel(1, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(6, 2), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_thumbnail_is_cached() {
        let file = MemFile::new(make_smdh()).with_name("icon.smdh").into_shared();
        let smdh = Nintendo3dsSmdh::new(file);
        let thumbs = Thumbnailer::new();

        let a = thumbs.thumbnail(&smdh, 96).unwrap();
        assert_eq!(a.dimensions(), (96, 96));
        let b = thumbs.thumbnail(&smdh, 96).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(thumbs.cached_count(), 1);
    }

    #[test]
    fn test_no_image_is_an_error() {
        let nsf = Nsf::new(MemFile::new(crate::formats::nsf::tests::make_nsf()).into_shared());
        assert!(pick_image(&nsf).is_none());
        assert!(Thumbnailer::new().thumbnail(&nsf, 64).is_err());
    }

    #[test]
    fn test_generate_batch_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("banner.smdh");
        std::fs::write(&src, make_smdh()).unwrap();
        let missing = dir.path().join("missing.smdh");

        let out = dir.path().join("thumbs");
        let results = Thumbnailer::new().generate_batch(&[src, missing], &out, 32);
        assert_eq!(results.len(), 2);
        let written = results[0].as_ref().unwrap();
        assert!(written.ends_with("banner.png"));
        assert_eq!(image::open(written).unwrap().width(), 32);
        assert!(results[1].is_err());
    }

    #[test]
    fn test_extract_rejects_external_type() {
        let smdh = Nintendo3dsSmdh::new(MemFile::new(make_smdh()).into_shared());
        let dir = tempfile::tempdir().unwrap();
        assert!(extract_image(&smdh, ImageType::ExtCover, &dir.path().join("x.png")).is_err());
        extract_image(&smdh, ImageType::IntIcon, &dir.path().join("icon.png")).unwrap();
        assert_eq!(image::open(dir.path().join("icon.png")).unwrap().width(), 48);
    }
}
