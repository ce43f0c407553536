//! Prime Core - Core types, group index, and caching for prime-inventory
//!
//! This crate provides the foundational types for syncing a Cisco Prime
//! device inventory:
//! - Remote device and group types parsed from Prime JSON rows
//! - Group index with parent/child edge resolution
//! - Vendor attribute to host variable mapping
//! - Group name sanitization
//! - Inventory store interface with an in-memory implementation
//! - Response caching keyed by run cache key and URL

pub mod attributes;
pub mod cache;
pub mod device;
pub mod group;
pub mod inventory;
pub mod sanitize;

pub use attributes::{map_attributes, HOST_ADDRESS_VAR, NETWORK_OS_VAR};
pub use cache::{
    cache_key_for_path, sha256_hex, CacheError, JsonFileCache, MemoryCache, ResponseCache,
};
pub use device::{AttrValue, ModelError, RemoteDevice, UNMANAGED};
pub use group::{GroupIndex, OrphanParent, ParentEdge, RemoteGroup};
pub use inventory::{is_reserved_name, Inventory, InventoryError, InventoryStore};
pub use sanitize::safe_group_name;
