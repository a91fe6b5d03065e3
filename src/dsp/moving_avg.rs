use serde::{Deserialize, Serialize};

/// Rolling mean over the most recent `window` samples.
///
/// Unlike a classic pre-filled moving average, the mean is taken over however
/// many samples have actually arrived, so the first few values are not
/// dragged toward zero.  The pitch smoother depends on that behavior for
/// clean note attacks.
#[derive(Debug, Deserialize, Serialize)]
pub struct MovingAverage {
    window: usize,
    total: f64,
    samples: Vec<f64>,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> MovingAverage {
        MovingAverage {
            window: window_size.max(1),
            total: 0.0,
            samples: vec![],
        }
    }

    pub fn get_mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.total / self.samples.len() as f64
    }

    pub fn get_window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn add_sample(&mut self, v: f64) -> () {
        self.total += v;
        self.samples.push(v);
        if self.samples.len() > self.window {
            self.total -= self.samples.remove(0);
        }
    }

    pub fn clear(&mut self) -> () {
        self.total = 0.0;
        self.samples.clear();
    }
}
