use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{FitError, Result};
use crate::math::matrix::Matrix;

/// Channel-first image geometry. Pixels are flattened as `c, y, x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub fn new(channels: usize, height: usize, width: usize) -> ImageShape {
        ImageShape { channels, height, width }
    }

    pub fn numel(&self) -> usize {
        self.channels * self.height * self.width
    }
}

/// One mini-batch: `images` is `len × shape.numel()`, one row per image.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub images: Matrix,
    pub labels: Vec<usize>,
    pub shape: ImageShape,
    pub device: Device,
}

impl Batch {
    pub fn new(images: Matrix, labels: Vec<usize>, shape: ImageShape) -> Result<Batch> {
        if images.rows != labels.len() {
            return Err(FitError::ShapeMismatch {
                context: "batch labels",
                expected: format!("{} labels", images.rows),
                got: format!("{} labels", labels.len()),
            });
        }
        if images.cols != shape.numel() {
            return Err(FitError::ShapeMismatch {
                context: "batch images",
                expected: format!("{} values per image", shape.numel()),
                got: format!("{} values per image", images.cols),
            });
        }
        Ok(Batch { images, labels, shape, device: Device::Cpu })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Moves the batch onto `device`.
    pub fn to(mut self, device: Device) -> Result<Batch> {
        device.ensure_available()?;
        self.device = device;
        Ok(self)
    }

    /// Pixels of image `index` in CHW order.
    pub fn image(&self, index: usize) -> &[f64] {
        self.images.row(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_geometry() {
        let shape = ImageShape::new(1, 2, 2);
        assert!(Batch::new(Matrix::zeros(3, 4), vec![0, 1, 2], shape).is_ok());
        assert!(Batch::new(Matrix::zeros(3, 4), vec![0, 1], shape).is_err());
        assert!(Batch::new(Matrix::zeros(3, 5), vec![0, 1, 2], shape).is_err());
    }

    #[test]
    fn moving_to_unavailable_device_fails() {
        let batch = Batch::new(Matrix::zeros(1, 1), vec![0], ImageShape::new(1, 1, 1)).unwrap();
        assert!(batch.clone().to(Device::Cpu).is_ok());
        assert!(batch.to(Device::Cuda(0)).is_err());
    }
}
