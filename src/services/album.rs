//! Album composition: turns the full set of successful results into one
//! downloadable page.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

use crate::models::image::ImageHandle;
use crate::models::job::RunSelection;
use crate::services::store::JobStateStore;

/// Merges named results into a single image.
pub trait Compositor: Send + Sync {
    fn compose(&self, results: &[(String, ImageHandle)]) -> Result<ImageHandle, AlbumError>;
}

/// Compose the album for a selection, refusing partial results.
///
/// The compositor is only called when every selected job is `Done`. The store
/// is read, never written, so a declined attempt leaves all statuses as they
/// were.
pub fn compose_album(
    store: &JobStateStore,
    selection: &RunSelection,
    compositor: &dyn Compositor,
) -> Result<ImageHandle, AlbumError> {
    let results: Vec<_> = store
        .done_results()
        .into_iter()
        .filter(|(name, _)| selection.contains(name))
        .collect();

    if results.is_empty() {
        metrics::counter!("album_compositions_total", "outcome" => "declined").increment(1);
        return Err(AlbumError::NothingGenerated);
    }
    if results.len() < selection.len() {
        metrics::counter!("album_compositions_total", "outcome" => "declined").increment(1);
        return Err(AlbumError::Incomplete {
            ready: results.len(),
            expected: selection.len(),
        });
    }

    let album = compositor.compose(&results);
    let outcome = if album.is_ok() { "composed" } else { "failed" };
    metrics::counter!("album_compositions_total", "outcome" => outcome).increment(1);
    album
}

const PHOTO_SIZE: u32 = 400;
const FRAME_SIDE: u32 = 20;
const FRAME_BOTTOM: u32 = 80;
const TILE_WIDTH: u32 = PHOTO_SIZE + 2 * FRAME_SIDE;
const TILE_HEIGHT: u32 = PHOTO_SIZE + FRAME_SIDE + FRAME_BOTTOM;
const GAP: u32 = 40;
const MARGIN: u32 = 60;
const MAX_COLUMNS: u32 = 3;

const BACKGROUND: Rgb<u8> = Rgb([24, 24, 24]);
const FRAME: Rgb<u8> = Rgb([245, 245, 240]);

/// Lays results out as polaroid-style tiles on a dark page, in result order.
pub struct GridAlbumCompositor {
    jpeg_quality: u8,
}

impl GridAlbumCompositor {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn tile(&self, name: &str, image: &ImageHandle) -> Result<RgbImage, AlbumError> {
        let photo = image::load_from_memory(image.bytes())
            .map_err(|source| AlbumError::Decode {
                name: name.to_string(),
                source,
            })?
            .resize_to_fill(PHOTO_SIZE, PHOTO_SIZE, FilterType::Lanczos3)
            .to_rgb8();

        let mut tile = RgbImage::from_pixel(TILE_WIDTH, TILE_HEIGHT, FRAME);
        imageops::overlay(&mut tile, &photo, i64::from(FRAME_SIDE), i64::from(FRAME_SIDE));
        Ok(tile)
    }
}

impl Default for GridAlbumCompositor {
    fn default() -> Self {
        Self::new(90)
    }
}

/// Page size for `count` tiles.
fn page_dimensions(count: u32) -> (u32, u32, u32) {
    let columns = count.clamp(1, MAX_COLUMNS);
    let rows = count.div_ceil(columns).max(1);
    let width = 2 * MARGIN + columns * TILE_WIDTH + (columns - 1) * GAP;
    let height = 2 * MARGIN + rows * TILE_HEIGHT + (rows - 1) * GAP;
    (columns, width, height)
}

impl Compositor for GridAlbumCompositor {
    fn compose(&self, results: &[(String, ImageHandle)]) -> Result<ImageHandle, AlbumError> {
        let (columns, width, height) = page_dimensions(results.len() as u32);
        let mut page = RgbImage::from_pixel(width, height, BACKGROUND);

        for (idx, (name, image)) in results.iter().enumerate() {
            let idx = idx as u32;
            let x = MARGIN + (idx % columns) * (TILE_WIDTH + GAP);
            let y = MARGIN + (idx / columns) * (TILE_HEIGHT + GAP);
            let tile = self.tile(name, image)?;
            imageops::overlay(&mut page, &tile, i64::from(x), i64::from(y));
        }

        let mut out = Vec::new();
        DynamicImage::ImageRgb8(page)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut out, self.jpeg_quality))
            .map_err(AlbumError::Encode)?;

        tracing::info!(
            photos = results.len(),
            width,
            height,
            bytes = out.len(),
            "Album composed"
        );

        Ok(ImageHandle::new(out, "image/jpeg"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlbumError {
    #[error("No images have been generated yet.")]
    NothingGenerated,

    #[error("Please wait for all selected images to finish generating before downloading the album ({ready} of {expected} ready).")]
    Incomplete { ready: usize, expected: usize },

    #[error("Could not decode result for {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Could not encode album: {0}")]
    Encode(image::ImageError),
}
