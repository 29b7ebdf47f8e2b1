use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a generator device owned by the engine.
    pub struct DeviceId;

    /// Identifies a scheduled timed action (a pending insertion).
    pub struct ActionId;
}

/// Identifies an entity owned by the surrounding world (an item, an agent).
/// The engine never allocates these; it only refers to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Identifies the material a generator emits into its resource store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKind(pub u32);
