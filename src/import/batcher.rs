pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Groups an iterator into `Vec`s of at most `size` items, preserving order.
/// The last batch may be shorter.
pub struct Batches<I: Iterator> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();

        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

/// A `size` of zero is treated as one.
pub fn batches<I: IntoIterator>(items: I, size: usize) -> Batches<I::IntoIter> {
    Batches {
        inner: items.into_iter(),
        size: size.max(1),
    }
}

/// Number of batches `len` items are split into.
pub fn batch_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1))
}

/// Accumulates items one at a time and hands out a full batch once `size` is reached.
#[derive(Debug)]
pub struct BatchBuffer<T> {
    items: Vec<T>,
    size: usize,
}

impl<T> BatchBuffer<T> {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);

        Self {
            items: Vec::with_capacity(size),
            size,
        }
    }

    /// Returns the filled batch when `item` completes it.
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.items.push(item);

        if self.items.len() >= self.size {
            Some(std::mem::replace(
                &mut self.items,
                Vec::with_capacity(self.size),
            ))
        } else {
            None
        }
    }

    /// Returns whatever is left, if anything.
    pub fn flush(&mut self) -> Option<Vec<T>> {
        if self.items.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.items))
        }
    }
}
