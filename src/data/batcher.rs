use rand::Rng;

use crate::data::generator::{generate, SequenceData};
use crate::error::{Error, Result};

/// One truncated-backprop window: `batch_size` rows of `num_steps` bits each.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub x: Vec<Vec<u8>>,
    pub y: Vec<Vec<u8>>,
}

impl Batch {
    pub fn batch_size(&self) -> usize {
        self.x.len()
    }

    pub fn num_steps(&self) -> usize {
        self.x.first().map_or(0, |r| r.len())
    }
}

/// Lengths derived from a sequence length and the window shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub batch_size: usize,
    pub num_steps: usize,
    /// Length of each of the `batch_size` contiguous rows.
    pub partition_length: usize,
    /// Number of windows per epoch.
    pub epoch_size: usize,
}

impl Partition {
    pub fn new(len: usize, batch_size: usize, num_steps: usize) -> Result<Partition> {
        if batch_size == 0 {
            return Err(Error::invalid("batch_size must be at least 1"));
        }
        if num_steps == 0 {
            return Err(Error::invalid("num_steps must be at least 1"));
        }
        let partition_length = len / batch_size;
        let epoch_size = partition_length / num_steps;
        if epoch_size == 0 {
            return Err(Error::invalid(format!(
                "sequence of length {len} is too short for batch_size {batch_size} \
                 and num_steps {num_steps}"
            )));
        }
        Ok(Partition { batch_size, num_steps, partition_length, epoch_size })
    }

    /// Elements actually visited by one epoch; the tails of each row are dropped.
    pub fn elements_per_epoch(&self) -> usize {
        self.epoch_size * self.batch_size * self.num_steps
    }
}

/// Iterates over the windows of one epoch in order.
///
/// Row `i` of every batch continues row `i` of the previous batch, so the
/// final hidden state of one window is the right initial state for the next.
#[derive(Debug, Clone)]
pub struct BatchIter {
    rows_x: Vec<Vec<u8>>,
    rows_y: Vec<Vec<u8>>,
    partition: Partition,
    next: usize,
}

impl BatchIter {
    fn from_partition(data: &SequenceData, partition: Partition) -> BatchIter {
        let len = partition.partition_length;
        let split = |seq: &[u8]| -> Vec<Vec<u8>> {
            (0..partition.batch_size)
                .map(|i| seq[i * len..(i + 1) * len].to_vec())
                .collect()
        };
        BatchIter {
            rows_x: split(&data.x),
            rows_y: split(&data.y),
            partition,
            next: 0,
        }
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }
}

impl Iterator for BatchIter {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.next >= self.partition.epoch_size {
            return None;
        }
        let start = self.next * self.partition.num_steps;
        let end = start + self.partition.num_steps;
        self.next += 1;

        let window = |rows: &[Vec<u8>]| rows.iter().map(|r| r[start..end].to_vec()).collect();
        Some(Batch {
            x: window(&self.rows_x),
            y: window(&self.rows_y),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.partition.epoch_size - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for BatchIter {}

/// Splits `data` into `batch_size` contiguous rows and walks them `num_steps` at a time.
pub fn gen_batch(data: &SequenceData, batch_size: usize, num_steps: usize) -> Result<BatchIter> {
    if data.x.len() != data.y.len() {
        return Err(Error::ShapeMismatch {
            expected: (1, data.x.len()),
            got: (1, data.y.len()),
        });
    }
    let partition = Partition::new(data.len(), batch_size, num_steps)?;
    Ok(BatchIter::from_partition(data, partition))
}

/// Yields `num_epochs` epochs, each over freshly generated data.
pub struct Epochs<'r, R: Rng + ?Sized> {
    rng: &'r mut R,
    data_size: usize,
    partition: Partition,
    remaining: usize,
}

impl<R: Rng + ?Sized> Iterator for Epochs<'_, R> {
    type Item = BatchIter;

    fn next(&mut self) -> Option<BatchIter> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let data = generate(self.data_size, &mut *self.rng);
        Some(BatchIter::from_partition(&data, self.partition))
    }
}

/// Checks the window shape once, then lazily generates one dataset per epoch.
pub fn gen_epochs<R: Rng + ?Sized>(
    num_epochs: usize,
    data_size: usize,
    batch_size: usize,
    num_steps: usize,
    rng: &mut R,
) -> Result<Epochs<'_, R>> {
    let partition = Partition::new(data_size, batch_size, num_steps)?;
    Ok(Epochs { rng, data_size, partition, remaining: num_epochs })
}
