//! Shared fixtures: an isolated library per test and synthetic image bytes.

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use media_library::{MediaLibrary, config::LibraryConfig, db};
use std::{io::Cursor, sync::Arc};
use tempfile::TempDir;

pub const SVG: &[u8] =
    br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10"/></svg>"#;

/// Keeps the temp dir alive for the library's lifetime.
pub struct TestLibrary {
    pub library: MediaLibrary,
    pub dir: TempDir,
}

pub async fn library() -> TestLibrary {
    library_with(LibraryConfig::default()).await
}

pub async fn library_with(config: LibraryConfig) -> TestLibrary {
    let dir = TempDir::new().unwrap();
    let library = MediaLibrary::new(open_db(&dir).await, dir.path().join("media"), config);
    TestLibrary { library, dir }
}

pub async fn open_db(dir: &TempDir) -> Arc<sqlx::SqlitePool> {
    std::fs::create_dir_all(dir.path().join("media")).unwrap();
    let pool = db::connect_file(&dir.path().join("library.db"))
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    Arc::new(pool)
}

/// A solid-colour image encoded as `format`.
pub fn image_bytes(format: ImageFormat, width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([shade, 64, 255 - shade, 255]));
    let img = match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
        _ => DynamicImage::ImageRgba8(img),
    };
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    image_bytes(ImageFormat::Jpeg, width, height, 10)
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    image_bytes(ImageFormat::Png, width, height, 20)
}

pub fn gif(width: u32, height: u32) -> Vec<u8> {
    image_bytes(ImageFormat::Gif, width, height, 30)
}

pub fn webp(width: u32, height: u32) -> Vec<u8> {
    image_bytes(ImageFormat::WebP, width, height, 40)
}
