//! [`DualArray`]: a host collection paired with its device mirror.

use tracing::trace;

use crate::device::DeviceArray;

/// A host-authored collection mirrored into a [`DeviceArray`].
///
/// The host side is appended to during authoring; the device side changes
/// only when [`sync`](DualArray::sync) is called. Any host mutation after
/// a sync leaves the mirror stale until the next sync.
#[derive(Clone, Debug)]
pub struct DualArray<T> {
    host: Vec<T>,
    device: DeviceArray<T>,
    host_version: u64,
    synced_version: u64,
}

impl<T: Clone> DualArray<T> {
    /// Empty host and device sides.
    pub fn new() -> Self {
        Self {
            host: Vec::new(),
            device: DeviceArray::new(),
            host_version: 0,
            synced_version: 0,
        }
    }

    /// Append to the host side and return the new element's index.
    pub fn push(&mut self, value: T) -> usize {
        self.host.push(value);
        self.host_version += 1;
        self.host.len() - 1
    }

    /// Host view.
    pub fn host(&self) -> &[T] {
        &self.host
    }

    /// Mutable host view. Marks the device mirror stale.
    pub fn host_mut(&mut self) -> &mut Vec<T> {
        self.host_version += 1;
        &mut self.host
    }

    /// Last element on the host side, mutably. Marks the mirror stale.
    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.host_version += 1;
        self.host.last_mut()
    }

    /// Device view.
    pub fn device(&self) -> &DeviceArray<T> {
        &self.device
    }

    /// Mutable device view.
    pub fn device_mut(&mut self) -> &mut DeviceArray<T> {
        &mut self.device
    }

    /// Copy the whole host side into a freshly sized device buffer.
    pub fn sync(&mut self) {
        self.device.assign(&self.host);
        self.synced_version = self.host_version;
        trace!(len = self.host.len(), generation = self.device.generation(), "dual array synced");
    }

    /// Copy the device buffer back over the host side.
    pub fn read_back(&mut self) {
        self.host = self.device.to_host();
        self.host_version += 1;
        self.synced_version = self.host_version;
    }

    /// Whether the host side changed since the last sync.
    pub fn is_stale(&self) -> bool {
        self.host_version != self.synced_version
    }

    /// Number of host elements.
    pub fn host_len(&self) -> usize {
        self.host.len()
    }

    /// Number of device elements.
    pub fn device_len(&self) -> usize {
        self.device.len()
    }
}

impl<T: Clone> Default for DualArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_sequential_indices() {
        let mut a = DualArray::new();
        assert_eq!(a.push(10), 0);
        assert_eq!(a.push(20), 1);
        assert_eq!(a.host(), &[10, 20]);
    }

    #[test]
    fn device_unchanged_until_sync() {
        let mut a = DualArray::new();
        a.push(1.0f32);
        assert_eq!(a.device_len(), 0);
        assert!(a.is_stale());
        a.sync();
        assert_eq!(a.device().as_slice(), &[1.0]);
        assert!(!a.is_stale());
        a.push(2.0);
        assert_eq!(a.device_len(), 1);
        assert!(a.is_stale());
    }

    #[test]
    fn read_back_copies_device_to_host() {
        let mut a = DualArray::new();
        a.push(1);
        a.push(2);
        a.sync();
        a.device_mut().as_mut_slice()[1] = 5;
        a.read_back();
        assert_eq!(a.host(), &[1, 5]);
        assert!(!a.is_stale());
    }

    #[test]
    fn host_mut_marks_stale() {
        let mut a = DualArray::new();
        a.push(0u8);
        a.sync();
        a.host_mut()[0] = 9;
        assert!(a.is_stale());
    }
}
