//! Procedurally drawn grayscale patterns: a small, fully separable image
//! classification task that needs no files on disk.

use std::collections::HashMap;

use rand::Rng;

use crate::data::batch::ImageShape;
use crate::data::dataset::ImageDataset;
use crate::error::{FitError, Result};

/// Class names in label order.
pub const PATTERN_CLASSES: [&str; 4] = ["horizontal", "vertical", "diagonal", "anti_diagonal"];

/// Generated dataset plus the name → label map describing it.
#[derive(Debug, Clone)]
pub struct SyntheticPatterns {
    pub dataset: ImageDataset,
    pub class_map: HashMap<String, usize>,
}

fn draw(class: usize, side: usize, offset: usize, image: &mut [f64]) {
    for t in 0..side {
        let (y, x) = match class {
            0 => (offset, t),
            1 => (t, offset),
            2 => (t, (t + offset) % side),
            _ => (t, (side - 1 + offset - t) % side),
        };
        image[y * side + x] = 1.0;
    }
}

/// Draws `per_class` images of each pattern on a `side × side` canvas.
///
/// Each image is a single line (row, column, or wrapped diagonal) at a random
/// offset, plus uniform noise in `[0, noise)` on every pixel, clamped to [0, 1].
pub fn patterns<R: Rng + ?Sized>(
    per_class: usize,
    side: usize,
    noise: f64,
    rng: &mut R,
) -> Result<SyntheticPatterns> {
    if side < 2 {
        return Err(FitError::InvalidConfig(format!("pattern side must be >= 2, got {side}")));
    }
    let shape = ImageShape::new(1, side, side);
    let mut images = Vec::with_capacity(per_class * PATTERN_CLASSES.len());
    let mut labels = Vec::with_capacity(per_class * PATTERN_CLASSES.len());

    for class in 0..PATTERN_CLASSES.len() {
        for _ in 0..per_class {
            let mut image: Vec<f64> = (0..shape.numel())
                .map(|_| if noise > 0.0 { rng.gen_range(0.0..noise) } else { 0.0 })
                .collect();
            draw(class, side, rng.gen_range(0..side), &mut image);
            image.iter_mut().for_each(|p| *p = p.clamp(0.0, 1.0));
            images.push(image);
            labels.push(class);
        }
    }

    let class_map = PATTERN_CLASSES
        .iter()
        .enumerate()
        .map(|(i, name)| ((*name).to_owned(), i))
        .collect();
    Ok(SyntheticPatterns { dataset: ImageDataset::new(shape, images, labels)?, class_map })
}
