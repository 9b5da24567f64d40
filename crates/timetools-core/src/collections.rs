//! Hash maps backing the instance store. The `std-hash` feature swaps
//! hashbrown for the standard library map.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::HashMap;
}

/// Instance slices by key.
pub(crate) type SliceMap<V> = map::HashMap<crate::store::InstanceKey, V>;
