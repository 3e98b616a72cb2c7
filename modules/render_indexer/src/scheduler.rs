/// Counts appended blocks and fires once every `interval` appends
#[derive(Debug)]
pub struct FlushScheduler {
    interval: usize,
    count: usize,
}

impl FlushScheduler {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            count: 0,
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Record one append; true exactly when the interval is reached, which
    /// also resets the count
    pub fn on_append(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.interval {
            self.count = 0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_every_nth_append() {
        let mut scheduler = FlushScheduler::new(3);
        let fired: Vec<bool> = (0..7).map(|_| scheduler.on_append()).collect();
        assert_eq!(fired, vec![false, false, true, false, false, true, false]);
    }

    #[test]
    fn interval_of_one_fires_every_time() {
        let mut scheduler = FlushScheduler::new(1);
        assert!(scheduler.on_append());
        assert!(scheduler.on_append());
    }
}
