//! Batch preview: the first few images of a batch laid out in a 3×3 grid
//! and written to a PNG, with their class names printed as a caption table.
use std::collections::HashMap;
use std::path::Path;

use image::{Rgb, RgbImage};

use crate::data::batch::Batch;
use crate::data::loader::BatchSource;
use crate::error::{FitError, Result};

/// Cells per side of the preview grid.
pub const GRID_SIDE: usize = 3;
/// Images shown at most.
pub const MAX_IMAGES: usize = GRID_SIDE * GRID_SIDE;

const PADDING: u32 = 4;
const MIN_TILE: u32 = 64;
const BACKGROUND: Rgb<u8> = Rgb([32, 32, 32]);

/// A rendered grid and the title of each filled cell, in row-major order.
#[derive(Debug, Clone)]
pub struct BatchGrid {
    pub image: RgbImage,
    pub titles: Vec<String>,
}

/// Orders a name → label map into a label-indexed list of names.
pub fn class_names_from_map(class_map: &HashMap<String, usize>) -> Vec<String> {
    let mut pairs: Vec<(&String, usize)> = class_map.iter().map(|(k, &v)| (k, v)).collect();
    pairs.sort_by_key(|&(name, idx)| (idx, name.clone()));
    pairs.into_iter().map(|(name, _)| name.clone()).collect()
}

fn to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Draws up to nine images of `batch` into one RGB canvas.
///
/// Images are CHW floats in [0, 1]; single-channel images are drawn in
/// grayscale. Each tile is upscaled by an integer factor so small inputs
/// stay visible.
pub fn render_batch_grid(batch: &Batch, class_names: &[String]) -> Result<BatchGrid> {
    let shape = batch.shape;
    if shape.channels != 1 && shape.channels != 3 {
        return Err(FitError::ShapeMismatch {
            context: "batch preview",
            expected: "1 or 3 channels".into(),
            got: format!("{} channels", shape.channels),
        });
    }
    let (h, w) = (shape.height as u32, shape.width as u32);
    let scale = (MIN_TILE / h.max(w).max(1)).max(1);
    let (tile_w, tile_h) = (w * scale, h * scale);
    let side = GRID_SIDE as u32;
    let mut canvas = RgbImage::from_pixel(
        side * tile_w + (side + 1) * PADDING,
        side * tile_h + (side + 1) * PADDING,
        BACKGROUND,
    );

    let plane = shape.height * shape.width;
    let mut titles = Vec::new();
    for (cell, &label) in batch.labels.iter().take(MAX_IMAGES).enumerate() {
        let pixels = batch.image(cell);
        let name = class_names
            .get(label)
            .ok_or(FitError::LabelOutOfRange { label, classes: class_names.len() })?;
        titles.push(name.clone());

        let x0 = PADDING + (cell as u32 % side) * (tile_w + PADDING);
        let y0 = PADDING + (cell as u32 / side) * (tile_h + PADDING);
        for y in 0..shape.height {
            for x in 0..shape.width {
                let at = |c: usize| to_u8(pixels[c * plane + y * shape.width + x]);
                let px = if shape.channels == 1 {
                    let g = at(0);
                    Rgb([g, g, g])
                } else {
                    Rgb([at(0), at(1), at(2)])
                };
                for dy in 0..scale {
                    for dx in 0..scale {
                        canvas.put_pixel(x0 + x as u32 * scale + dx, y0 + y as u32 * scale + dy, px);
                    }
                }
            }
        }
    }

    Ok(BatchGrid { image: canvas, titles })
}

/// Formats titles as a grid of left-aligned columns.
pub fn caption_table(titles: &[String]) -> String {
    let width = titles.iter().map(String::len).max().unwrap_or(0);
    titles
        .chunks(GRID_SIDE)
        .map(|row| {
            row.iter()
                .map(|t| format!("{t:<width$}"))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pulls one batch from `loader`, writes its 3×3 preview to `out_path`, and
/// prints the class names of the shown images.
pub fn show_batch_images(
    loader: &mut dyn BatchSource,
    class_names: &[String],
    out_path: impl AsRef<Path>,
) -> Result<()> {
    let out_path = out_path.as_ref();
    let batch = loader
        .batches()
        .next()
        .ok_or(FitError::EmptySource { phase: "preview" })?;
    let grid = render_batch_grid(&batch, class_names)?;
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    grid.image.save(out_path)?;
    tracing::info!(path = %out_path.display(), images = grid.titles.len(), "wrote batch preview");
    println!("{}", caption_table(&grid.titles));
    Ok(())
}
