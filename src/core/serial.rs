use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicI64, Ordering};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 4;

/// Produces `PP-{year}-{unixMillis}-{4 base36 chars}` serial numbers.
///
/// The millisecond component is strictly increasing per generator, so serials
/// from one process never collide and sort in creation order.
#[derive(Debug, Default)]
pub struct SerialNumberGenerator {
    last_millis: AtomicI64,
}

impl SerialNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_serial(&self) -> String {
        self.next_at(Utc::now())
    }

    fn next_at(&self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        let previous = self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(millis.max(last + 1))
            })
            .unwrap_or(millis);
        let stamp = millis.max(previous + 1);

        format!("PP-{}-{}-{}", now.year(), stamp, random_suffix())
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}
