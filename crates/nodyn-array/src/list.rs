//! Lists of device arrays packed into one buffer.

use crate::device::DeviceArray;

/// A sequence of variable-length lists stored as one flat device buffer
/// plus an offset table. List `k` spans `offsets[k]..offsets[k + 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceArrayList<T> {
    offsets: DeviceArray<u32>,
    elements: DeviceArray<T>,
}

impl<T> DeviceArrayList<T> {
    /// No lists.
    pub fn new() -> Self {
        Self {
            offsets: DeviceArray::from_iter([0u32]),
            elements: DeviceArray::new(),
        }
    }

    /// Number of lists.
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Whether there are no lists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total elements across all lists.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    fn span(&self, k: usize) -> Option<(usize, usize)> {
        let offsets = self.offsets.as_slice();
        let start = *offsets.get(k)? as usize;
        let end = *offsets.get(k + 1)? as usize;
        Some((start, end))
    }

    /// List `k`.
    pub fn list(&self, k: usize) -> Option<&[T]> {
        let (start, end) = self.span(k)?;
        Some(&self.elements.as_slice()[start..end])
    }

    /// List `k`, mutably.
    pub fn list_mut(&mut self, k: usize) -> Option<&mut [T]> {
        let (start, end) = self.span(k)?;
        Some(&mut self.elements.as_mut_slice()[start..end])
    }

    /// Flat element buffer.
    pub fn elements(&self) -> &DeviceArray<T> {
        &self.elements
    }
}

impl<T: Clone> DeviceArrayList<T> {
    /// Replace all lists with copies of `host`.
    pub fn assign(&mut self, host: &[Vec<T>]) {
        let mut offsets = Vec::with_capacity(host.len() + 1);
        let mut flat = Vec::with_capacity(host.iter().map(Vec::len).sum());
        offsets.push(0u32);
        for list in host {
            flat.extend_from_slice(list);
            offsets.push(flat.len() as u32);
        }
        self.offsets.assign(&offsets);
        self.elements.assign(&flat);
    }
}

impl<T: Clone + Default> DeviceArrayList<T> {
    /// Reallocate as `counts.len()` lists of default elements, list `k`
    /// holding `counts[k]` elements.
    pub fn resize(&mut self, counts: &[u32]) {
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        let mut total = 0u32;
        offsets.push(0);
        for &c in counts {
            total += c;
            offsets.push(total);
        }
        self.offsets.assign(&offsets);
        self.elements.resize(total as usize);
    }
}

impl<T> Default for DeviceArrayList<T> {
    fn default() -> Self {
        Self::new()
    }
}
