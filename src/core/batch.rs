use crate::types::{Batch, FireError, FireResult, PipelineConfig, Sample};
use ndarray::{s, Array4, Array5};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::mpsc;
use std::thread;

/// Groups a sample stream into fixed-size batches.
///
/// Optionally re-shuffles sample order within a bounded buffer before
/// batching (independent of the stratified shuffle already performed by the
/// sampler): the buffer is kept full and each emitted sample is drawn
/// uniformly from it. A final partial batch is emitted unless
/// `drop_remainder` is set. Errors from the underlying stream pass through
/// as `Err` items.
///
/// The stream is finite: it ends when the underlying sampler is exhausted.
/// Construct a fresh sampler and stream for another epoch.
pub struct BatchStream<I> {
    inner: I,
    config: PipelineConfig,
    buffer: Vec<Sample>,
    rng: StdRng,
    exhausted: bool,
}

impl<I> BatchStream<I>
where
    I: Iterator<Item = FireResult<Sample>>,
{
    pub fn new(inner: I, config: &PipelineConfig) -> FireResult<Self> {
        Self::with_rng(inner, config, StdRng::from_entropy())
    }

    /// Seeded variant; the buffer shuffle becomes reproducible
    pub fn with_seed(inner: I, config: &PipelineConfig, seed: u64) -> FireResult<Self> {
        Self::with_rng(inner, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(inner: I, config: &PipelineConfig, rng: StdRng) -> FireResult<Self> {
        config.validate()?;
        Ok(Self {
            inner,
            config: config.clone(),
            buffer: Vec::new(),
            rng,
            exhausted: false,
        })
    }

    fn next_sample(&mut self) -> Option<FireResult<Sample>> {
        if self.config.shuffle_buffer <= 1 {
            if self.exhausted {
                return None;
            }
            match self.inner.next() {
                Some(item) => return Some(item),
                None => {
                    self.exhausted = true;
                    return None;
                }
            }
        }

        while !self.exhausted && self.buffer.len() < self.config.shuffle_buffer {
            match self.inner.next() {
                Some(Ok(sample)) => self.buffer.push(sample),
                Some(Err(err)) => return Some(Err(err)),
                None => self.exhausted = true,
            }
        }

        if self.buffer.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.buffer.len());
        Some(Ok(self.buffer.swap_remove(index)))
    }

    fn stack(&self, samples: Vec<Sample>) -> FireResult<Batch> {
        let count = samples.len();
        let patch = self.config.patch_size;
        let mut x = Array5::zeros((
            count,
            self.config.seq_len,
            patch,
            patch,
            self.config.channels,
        ));
        let mut y = Array4::zeros((count, self.config.horizons, patch, patch));

        for (n, sample) in samples.into_iter().enumerate() {
            let expected_x = (self.config.seq_len, patch, patch, self.config.channels);
            if sample.x.dim() != expected_x {
                return Err(FireError::Shape(format!(
                    "sample x shape {:?} does not match configured {:?}",
                    sample.x.dim(),
                    expected_x
                )));
            }
            let expected_y = (self.config.horizons, patch, patch);
            if sample.y.dim() != expected_y {
                return Err(FireError::Shape(format!(
                    "sample y shape {:?} does not match configured {:?}",
                    sample.y.dim(),
                    expected_y
                )));
            }
            x.slice_mut(s![n, .., .., .., ..]).assign(&sample.x);
            y.slice_mut(s![n, .., .., ..]).assign(&sample.y);
        }

        Ok(Batch { x, y })
    }
}

impl<I> Iterator for BatchStream<I>
where
    I: Iterator<Item = FireResult<Sample>>,
{
    type Item = FireResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut samples = Vec::with_capacity(self.config.batch_size);
        while samples.len() < self.config.batch_size {
            match self.next_sample() {
                Some(Ok(sample)) => samples.push(sample),
                Some(Err(err)) => return Some(Err(err)),
                None => break,
            }
        }

        if samples.is_empty() {
            return None;
        }
        if samples.len() < self.config.batch_size && self.config.drop_remainder {
            return None;
        }
        Some(self.stack(samples))
    }
}

impl<I> BatchStream<I>
where
    I: Iterator<Item = FireResult<Sample>> + Send + 'static,
{
    /// Move the stream into a background thread with a bounded look-ahead
    /// channel, so batch production runs ahead of the consumer.
    pub fn prefetch(self, capacity: usize) -> PrefetchedBatches {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let handle = thread::spawn(move || {
            for batch in self {
                if tx.send(batch).is_err() {
                    // consumer dropped the stream
                    break;
                }
            }
        });
        PrefetchedBatches {
            rx: Some(rx),
            handle: Some(handle),
        }
    }
}

/// Batch stream backed by a producer thread; yields until the producer is
/// exhausted, joining it on drop.
pub struct PrefetchedBatches {
    rx: Option<mpsc::Receiver<FireResult<Batch>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Iterator for PrefetchedBatches {
    type Item = FireResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.as_ref()?.recv().ok()
    }
}

impl Drop for PrefetchedBatches {
    fn drop(&mut self) {
        // disconnect first so a blocked producer can exit
        self.rx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
