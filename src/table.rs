use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
}

impl<T> Entry<T> {
    /// Create a new cell with the given value.
    fn new(value: T) -> Self {
        Self { value, next: 0 }
    }

    /// Get the reference to the value.
    fn value(&self) -> &T {
        &self.value
    }

    /// Get the index of the next cell in the bucket chain.
    fn next(&self) -> usize {
        self.next
    }
    /// Set the index of the next cell in the bucket chain.
    fn set_next(&mut self, next: usize) {
        self.next = next;
    }
}

/// Append-only hash-consing table.
///
/// Values are addressed by 1-based indices that stay valid for the lifetime of
/// the table; index 0 is the "no entry" sentinel used by bucket chains.
/// The table grows on demand, so the number of bits only sizes the bucket array.
pub struct Table<T> {
    data: Vec<Entry<T>>,

    buckets: Vec<usize>,
    bitmask: u64,
}

impl<T> Table<T> {
    /// Create a new table with `2^bits` buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let buckets_size = 1 << bits;
        Self {
            data: Vec::with_capacity(buckets_size),
            buckets: vec![0; buckets_size],
            bitmask: (buckets_size - 1) as u64,
        }
    }

    /// Get the number of stored values, which is also the largest valid index.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        self.data[index - 1].value()
    }

    /// Get the index of the next cell.
    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index - 1].next()
    }

    fn set_next(&mut self, index: usize, next: usize) {
        assert_ne!(index, 0, "Index is 0");
        self.data[index - 1].set_next(next);
    }

    /// Add a new value to the table, without deduplication, and return its index.
    pub fn add(&mut self, value: T) -> usize {
        assert!(self.data.len() < i32::MAX as usize, "Storage is full");
        self.data.push(Entry::new(value));
        self.data.len()
    }
}

impl<T> Table<T>
where
    T: MyHash,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Put a value into the table and return its index.
    ///
    /// Equal values always yield the same index.
    pub fn put(&mut self, value: T) -> usize
    where
        T: Eq,
    {
        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            // First value in this bucket.
            let i = self.add(value);
            self.buckets[bucket_index] = i;
            return i;
        }

        loop {
            assert!(index > 0);

            if &value == self.value(index) {
                return index;
            }

            let next = self.next(index);
            if next == 0 {
                let i = self.add(value);
                self.set_next(index, i);
                return i;
            }
            index = next;
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
