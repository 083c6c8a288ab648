use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Rolling FIFO window of the most recent raw samples for one device.
#[derive(Clone, Debug)]
pub struct DeviceBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}
impl DeviceBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    /// Appends in arrival order, evicting from the front once full.
    pub fn append(&mut self, new_samples: &[f64]) {
        // Only the tail of an oversized batch can survive.
        let skip = new_samples.len().saturating_sub(self.capacity);
        for &sample in &new_samples[skip..] {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

type Shared = Arc<Mutex<DeviceBuffer>>;

/// Buffers for every device, keyed by device id.
///
/// The outer map lock is only held to look up or create an entry; each device's
/// buffer has its own mutex, so appends for different devices never wait on
/// each other while appends for the same device are serialised.
pub struct DeviceBufferStore {
    devices: RwLock<HashMap<String, Shared>>,
    capacity: usize,
}
impl DeviceBufferStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    fn entry(&self, device_id: &str) -> Shared {
        if let Some(existing) = self.devices.read().get(device_id) {
            return Arc::clone(existing);
        }
        let mut devices = self.devices.write();
        Arc::clone(
            devices
                .entry(device_id.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(DeviceBuffer::with_capacity(self.capacity)))),
        )
    }
    pub fn append(&self, device_id: &str, samples: &[f64]) {
        self.entry(device_id).lock().append(samples);
    }
    /// Appends and returns the resulting window under a single lock, so the
    /// window always reflects exactly this append.
    pub fn append_and_snapshot(&self, device_id: &str, samples: &[f64]) -> Vec<f64> {
        let shared = self.entry(device_id);
        let mut buffer = shared.lock();
        buffer.append(samples);
        buffer.snapshot()
    }
    /// Current window for a device; `None` when the device has never been seen.
    pub fn snapshot(&self, device_id: &str) -> Option<Vec<f64>> {
        let shared = self.devices.read().get(device_id).map(Arc::clone)?;
        let window = shared.lock().snapshot();
        Some(window)
    }
    pub fn len(&self, device_id: &str) -> usize {
        self.devices
            .read()
            .get(device_id)
            .map(|shared| shared.lock().len())
            .unwrap_or(0)
    }
    /// Drops a device's buffer. Returns whether it existed.
    pub fn reset(&self, device_id: &str) -> bool {
        self.devices.write().remove(device_id).is_some()
    }
    pub fn reset_all(&self) {
        self.devices.write().clear();
    }
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
