//! Row-major 2-D device arrays.

use rayon::prelude::*;

use crate::device::DeviceArray;
use crate::error::ArrayError;

/// A `nx × ny` device array stored row-major (`index = j * nx + i`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceArray2D<T> {
    nx: usize,
    ny: usize,
    data: DeviceArray<T>,
}

impl<T> DeviceArray2D<T> {
    /// An empty 0×0 array.
    pub fn new() -> Self {
        Self {
            nx: 0,
            ny: 0,
            data: DeviceArray::new(),
        }
    }

    /// Width (elements per row).
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Height (number of rows).
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at column `i`, row `j`.
    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        if i >= self.nx || j >= self.ny {
            return None;
        }
        self.data.get(j * self.nx + i)
    }

    /// Row `j` as a slice.
    pub fn row(&self, j: usize) -> Option<&[T]> {
        if j >= self.ny {
            return None;
        }
        Some(&self.data.as_slice()[j * self.nx..(j + 1) * self.nx])
    }

    /// Flat device view.
    pub fn as_flat(&self) -> &DeviceArray<T> {
        &self.data
    }
}

impl<T: Clone> DeviceArray2D<T> {
    /// Replace the whole array with `host`, which must hold `nx * ny`
    /// elements in row-major order.
    pub fn assign(&mut self, nx: usize, ny: usize, host: &[T]) -> Result<(), ArrayError> {
        if nx * ny != host.len() {
            return Err(ArrayError::DimensionMismatch {
                nx,
                ny,
                len: host.len(),
            });
        }
        self.nx = nx;
        self.ny = ny;
        self.data.assign(host);
        Ok(())
    }
}

impl<T: Send + Sync> DeviceArray2D<T> {
    /// Run `f(i, j, element)` on every element in parallel.
    pub fn par_for_each_mut<F>(&mut self, f: F)
    where
        F: Fn(usize, usize, &mut T) + Sync + Send,
    {
        let nx = self.nx.max(1);
        self.data
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(k, v)| f(k % nx, k / nx, v));
    }
}
