/// Moving average over the most recent `capacity` samples.
///
/// `sum` always equals the sum of the samples still held in `buffer`, so
/// both `add` and `get` are O(1).
#[derive(Debug, Clone)]
pub struct RollingStats {
    buffer: Vec<f64>,
    sum: f64,
    write_index: usize,
    count: u64,
}

impl RollingStats {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            sum: 0.0,
            write_index: 0,
            count: 0,
        }
    }

    pub fn add(&mut self, value: f64) {
        let slot = &mut self.buffer[self.write_index];
        self.sum += value - *slot;
        *slot = value;
        self.write_index = (self.write_index + 1) % self.buffer.len();
        self.count += 1;
    }

    /// Mean of the held samples, or `-1.0` if nothing was ever added.
    pub fn get(&self) -> f64 {
        if self.count == 0 {
            return -1.0;
        }
        self.sum / self.len() as f64
    }

    pub fn len(&self) -> usize {
        std::cmp::min(self.count, self.buffer.len() as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

/// The two moving averages the collector maintains and the pacer reports.
#[derive(Debug, Clone)]
pub struct LiveStats {
    pub latency_ms: RollingStats,
    pub queue_time_ms: RollingStats,
}

impl LiveStats {
    pub fn new(window: usize) -> Self {
        Self {
            latency_ms: RollingStats::new(window),
            queue_time_ms: RollingStats::new(window),
        }
    }
}

pub type SharedLiveStats = std::sync::Arc<tokio::sync::Mutex<LiveStats>>;
