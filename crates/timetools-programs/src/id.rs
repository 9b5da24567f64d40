//! Todo item ids.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use uuid::Uuid;

const TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A random v4 UUID. Falls back to a seeded generator when the OS source
/// cannot be read.
pub fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(err) => {
            log::warn!("os random source unavailable ({err}); using seeded ids");
            fallback_id(&mut fallback_rng())
        }
    }
}

/// Fills the v4 template: `x` is any hex digit, `y` is one of `8..=b`.
pub fn fallback_id<R: Rng>(rng: &mut R) -> String {
    TEMPLATE
        .chars()
        .map(|c| match c {
            'x' => hex_digit(rng.gen_range(0..16)),
            'y' => hex_digit((rng.gen_range(0..16) & 0x3) | 0x8),
            other => other,
        })
        .collect()
}

pub fn is_v4_uuid(id: &str) -> bool {
    Uuid::parse_str(id)
        .map(|uuid| uuid.get_version_num() == 4)
        .unwrap_or(false)
}

fn hex_digit(value: u32) -> char {
    char::from_digit(value, 16).unwrap_or('0')
}

fn fallback_rng() -> StdRng {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default();
    let sequence = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    StdRng::seed_from_u64(nanos ^ sequence.rotate_left(32))
}
