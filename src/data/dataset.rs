use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::batch::ImageShape;
use crate::error::{FitError, Result};

/// In-memory labelled images, each a flat CHW vector normalized to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDataset {
    shape: ImageShape,
    images: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl ImageDataset {
    pub fn new(shape: ImageShape, images: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Self> {
        if images.len() != labels.len() {
            return Err(FitError::ShapeMismatch {
                context: "dataset",
                expected: format!("{} labels", images.len()),
                got: format!("{} labels", labels.len()),
            });
        }
        if let Some(bad) = images.iter().find(|img| img.len() != shape.numel()) {
            return Err(FitError::ShapeMismatch {
                context: "dataset image",
                expected: format!("{} values", shape.numel()),
                got: format!("{} values", bad.len()),
            });
        }
        Ok(ImageDataset { shape, images, labels })
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(&[f64], usize)> {
        Some((self.images.get(index)?.as_slice(), *self.labels.get(index)?))
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Randomly partitions into `(train, val)` with `round(len · val_fraction)`
    /// samples in the validation half.
    pub fn split<R: Rng + ?Sized>(self, val_fraction: f64, rng: &mut R) -> Result<(Self, Self)> {
        if !(0.0..1.0).contains(&val_fraction) {
            return Err(FitError::InvalidConfig(format!(
                "val_fraction must lie in [0, 1), got {val_fraction}"
            )));
        }
        let n_val = (self.len() as f64 * val_fraction).round() as usize;
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        let ImageDataset { shape, mut images, labels } = self;
        let mut slots: Vec<Option<Vec<f64>>> = images.drain(..).map(Some).collect();
        let mut take = |ids: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
            ids.iter()
                .map(|&i| (slots[i].take().unwrap_or_default(), labels[i]))
                .unzip()
        };
        let (val_images, val_labels) = take(&order[..n_val]);
        let (train_images, train_labels) = take(&order[n_val..]);
        Ok((
            ImageDataset { shape, images: train_images, labels: train_labels },
            ImageDataset { shape, images: val_images, labels: val_labels },
        ))
    }
}
