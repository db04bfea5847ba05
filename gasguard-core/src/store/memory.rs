use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::errors::{StoreError, StoreResult};
use crate::reading::Reading;
use crate::traits::ReadingStore;

use super::tail;

type Series = Arc<RwLock<Vec<Reading>>>;

/// In-memory reading store
///
/// The outer map lock is held only long enough to find (or create) a sensor
/// type's series; appends and reads then lock that series alone, so traffic
/// on one sensor type never waits on another.
#[derive(Debug, Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<String, Series>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with `readings`, in the given order
    pub fn with_readings(readings: impl IntoIterator<Item = Reading>) -> StoreResult<Self> {
        let store = Self::new();
        for reading in readings {
            store.append(reading)?;
        }
        Ok(store)
    }

    /// Number of readings held for `sensor_type`
    pub fn len(&self, sensor_type: &str) -> StoreResult<usize> {
        match self.find(sensor_type)? {
            Some(series) => Ok(series.read().map_err(|_| StoreError::LockPoisoned)?.len()),
            None => Ok(0),
        }
    }

    /// Every stored reading of `sensor_type`, oldest first
    pub fn readings(&self, sensor_type: &str) -> StoreResult<Vec<Reading>> {
        match self.find(sensor_type)? {
            Some(series) => Ok(series.read().map_err(|_| StoreError::LockPoisoned)?.clone()),
            None => Ok(Vec::new()),
        }
    }

    fn find(&self, sensor_type: &str) -> StoreResult<Option<Series>> {
        let map = self.series.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(sensor_type).cloned())
    }

    fn find_or_create(&self, sensor_type: &str) -> StoreResult<Series> {
        if let Some(series) = self.find(sensor_type)? {
            return Ok(series);
        }
        let mut map = self.series.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.entry(sensor_type.to_string()).or_default().clone())
    }
}

impl ReadingStore for MemoryStore {
    fn append(&self, reading: Reading) -> StoreResult<()> {
        let series = self.find_or_create(&reading.sensor_type)?;
        series.write().map_err(|_| StoreError::LockPoisoned)?.push(reading);
        Ok(())
    }

    fn recent(&self, sensor_type: &str, count: usize) -> StoreResult<Vec<Reading>> {
        match self.find(sensor_type)? {
            Some(series) => {
                let rows = series.read().map_err(|_| StoreError::LockPoisoned)?;
                Ok(tail(&rows, count))
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::thread;

    fn reading(sensor_type: &str, minute: i64, value: f64) -> Reading {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        Reading::new(at, "dev", sensor_type, value)
    }

    #[test]
    fn recent_is_oldest_first_and_bounded() {
        let store = MemoryStore::with_readings((0..10).map(|i| reading("mq5_01", i, i as f64))).unwrap();

        let values: Vec<f64> = store.recent("mq5_01", 3).unwrap().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![7.0, 8.0, 9.0]);
        assert_eq!(store.recent("mq5_01", 50).unwrap().len(), 10);
        assert!(store.recent("mq5_01", 0).unwrap().is_empty());
    }

    #[test]
    fn sensor_types_are_separate() {
        let store = MemoryStore::new();
        store.append(reading("mq5_01", 0, 100.0)).unwrap();
        store.append(reading("temp_01", 0, 21.0)).unwrap();
        store.append(reading("mq5_01", 1, 110.0)).unwrap();

        assert_eq!(store.len("mq5_01").unwrap(), 2);
        assert_eq!(store.len("temp_01").unwrap(), 1);
        assert_eq!(store.len("light_01").unwrap(), 0);
        assert!(store.recent("light_01", 5).unwrap().is_empty());
    }

    #[test]
    fn concurrent_appends_are_all_visible() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = ["mq5_01", "temp_01", "humidity_01", "mq5_01"]
            .into_iter()
            .map(|sensor_type| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        store.append(reading(sensor_type, i, i as f64)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len("mq5_01").unwrap(), 500);
        assert_eq!(store.len("temp_01").unwrap(), 250);
        assert_eq!(store.readings("humidity_01").unwrap().len(), 250);
    }
}
