//! [`DeviceArray`]: a flat buffer processed by per-element parallel passes.

use rayon::prelude::*;

use crate::error::{check_len, ArrayError};

/// A parallel-device-resident array.
///
/// Every reallocation bumps the array's generation, so consumers holding a
/// length or generation from an earlier sync can detect that the buffer
/// was replaced.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceArray<T> {
    data: Vec<T>,
    generation: u32,
}

impl<T> DeviceArray<T> {
    /// An empty array at generation 0.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            generation: 0,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// How many times the buffer has been reallocated.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Read-only view of the device buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable view of the device buffer.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Element at `i`, if in range.
    pub fn get(&self, i: usize) -> Option<&T> {
        self.data.get(i)
    }

    /// Sequential iterator over elements.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Release the buffer.
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Fail with [`ArrayError::LengthMismatch`] unless `len() == expected`.
    pub fn ensure_len(&self, name: &str, expected: usize) -> Result<(), ArrayError> {
        check_len(name, expected, self.data.len())
    }

    fn replace(&mut self, data: Vec<T>) {
        self.data = data;
        self.generation = self.generation.wrapping_add(1);
    }
}

impl<T: Clone> DeviceArray<T> {
    /// Allocate a device array holding a copy of `host`.
    pub fn from_host(host: &[T]) -> Self {
        Self {
            data: host.to_vec(),
            generation: 1,
        }
    }

    /// Replace the whole buffer with a fresh copy of `host`.
    ///
    /// Always reallocates, even when the length is unchanged; a buffer
    /// sized for a stale count is never partially overwritten.
    pub fn assign(&mut self, host: &[T]) {
        self.replace(host.to_vec());
    }

    /// Reallocate to `len` copies of `value`.
    pub fn fill_new(&mut self, len: usize, value: T) {
        self.replace(vec![value; len]);
    }

    /// Copy the device buffer back to host memory.
    pub fn to_host(&self) -> Vec<T> {
        self.data.clone()
    }
}

impl<T: Clone + Default> DeviceArray<T> {
    /// Allocate `len` default elements.
    pub fn with_len(len: usize) -> Self {
        Self {
            data: vec![T::default(); len],
            generation: 1,
        }
    }

    /// Reallocate to `len` default elements.
    pub fn resize(&mut self, len: usize) {
        self.replace(vec![T::default(); len]);
    }
}

impl<T: Send + Sync> DeviceArray<T> {
    /// Run `f(index, element)` on every element in parallel.
    ///
    /// Returns after all elements were processed.
    pub fn par_for_each_mut<F>(&mut self, f: F)
    where
        F: Fn(usize, &mut T) + Sync + Send,
    {
        self.data
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, v)| f(i, v));
    }

    /// Produce a new array with `f(index, element)` evaluated per element.
    pub fn par_map<U, F>(&self, f: F) -> DeviceArray<U>
    where
        U: Send,
        F: Fn(usize, &T) -> U + Sync + Send,
    {
        let data: Vec<U> = self.data.par_iter().enumerate().map(|(i, v)| f(i, v)).collect();
        DeviceArray {
            data,
            generation: 1,
        }
    }

    /// Run `f(index, element, other[index])` on every element in parallel.
    ///
    /// Fails without touching any element if the lengths differ.
    pub fn par_zip_mut<U, F>(
        &mut self,
        name: &str,
        other: &DeviceArray<U>,
        f: F,
    ) -> Result<(), ArrayError>
    where
        U: Sync,
        F: Fn(usize, &mut T, &U) + Sync + Send,
    {
        check_len(name, self.data.len(), other.data.len())?;
        self.data
            .par_iter_mut()
            .zip(other.data.par_iter())
            .enumerate()
            .for_each(|(i, (a, b))| f(i, a, b));
        Ok(())
    }
}

impl<T> Default for DeviceArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> FromIterator<T> for DeviceArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
            generation: 1,
        }
    }
}

impl<'a, T> IntoIterator for &'a DeviceArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}
