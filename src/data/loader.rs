use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::batch::Batch;
use crate::data::dataset::ImageDataset;
use crate::error::{FitError, Result};
use crate::math::matrix::Matrix;

/// Anything that can produce a fresh pass of batches, once per epoch.
pub trait BatchSource {
    fn batches(&mut self) -> Box<dyn Iterator<Item = Batch> + '_>;
}

impl<S: BatchSource + ?Sized> BatchSource for &mut S {
    fn batches(&mut self) -> Box<dyn Iterator<Item = Batch> + '_> {
        (**self).batches()
    }
}

/// A fixed list of pre-built batches replayed in order every epoch.
impl BatchSource for Vec<Batch> {
    fn batches(&mut self) -> Box<dyn Iterator<Item = Batch> + '_> {
        Box::new(self.iter().cloned())
    }
}

/// Slices an `ImageDataset` into mini-batches, optionally reshuffling the
/// sample order at the start of every pass.
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: ImageDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    rng: StdRng,
}

impl DataLoader {
    pub fn new(dataset: ImageDataset, batch_size: usize) -> Result<DataLoader> {
        if batch_size == 0 {
            return Err(FitError::InvalidConfig("batch_size must be at least 1".into()));
        }
        Ok(DataLoader {
            dataset,
            batch_size,
            shuffle: false,
            drop_last: false,
            rng: StdRng::from_entropy(),
        })
    }

    /// Reshuffle every pass, seeded for reproducibility.
    pub fn shuffled(mut self, seed: u64) -> DataLoader {
        self.shuffle = true;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Skip a trailing batch smaller than `batch_size`.
    pub fn drop_last(mut self, drop_last: bool) -> DataLoader {
        self.drop_last = drop_last;
        self
    }

    pub fn dataset(&self) -> &ImageDataset {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches one pass yields.
    pub fn len(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last { n / self.batch_size } else { n.div_ceil(self.batch_size) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collate(&self, indices: &[usize]) -> Batch {
        let shape = self.dataset.shape();
        let mut pixels = Vec::with_capacity(indices.len() * shape.numel());
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            if let Some((image, label)) = self.dataset.get(i) {
                pixels.extend_from_slice(image);
                labels.push(label);
            }
        }
        Batch {
            images: Matrix::from_vec(labels.len(), shape.numel(), pixels),
            labels,
            shape,
            device: Default::default(),
        }
    }
}

impl BatchSource for DataLoader {
    fn batches(&mut self) -> Box<dyn Iterator<Item = Batch> + '_> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        let batch_size = self.batch_size;
        let drop_last = self.drop_last;
        let this: &DataLoader = self;
        Box::new(
            (0..order.len())
                .step_by(batch_size)
                .map(move |start| order[start..(start + batch_size).min(order.len())].to_vec())
                .filter(move |chunk| !drop_last || chunk.len() == batch_size)
                .map(move |chunk| this.collate(&chunk)),
        )
    }
}
