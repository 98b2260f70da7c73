//! Enum translation tables.
//!
//! The guest passes enumerations as compact integer codes; the host API
//! takes strings. Each domain has one shared [`EnumTable`] whose position
//! order matches the guest's compile-time code assignment.
//!
//! - Guest to host is an index and fails loudly on an out-of-range code.
//! - Host to guest is a search and yields the table length as the
//!   "unrecognized" code for strings the table does not know.

pub mod gpu;

use crate::error::{BridgeError, Result};

/// Ordered string values for one enumeration domain.
#[derive(Debug)]
pub struct EnumTable {
    name: &'static str,
    values: &'static [&'static str],
}

impl EnumTable {
    /// Define a table.
    pub const fn new(name: &'static str, values: &'static [&'static str]) -> Self {
        Self { name, values }
    }

    /// Domain name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The values in code order.
    pub fn values(&self) -> &'static [&'static str] {
        self.values
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the domain is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Code returned for strings the table does not contain. Also the code
    /// a guest uses for an absent optional enum.
    pub fn unknown(&self) -> u32 {
        self.values.len() as u32
    }

    /// Translate a guest code.
    pub fn to_host(&self, code: u32) -> Result<&'static str> {
        self.values
            .get(code as usize)
            .copied()
            .ok_or(BridgeError::EnumOutOfRange {
                domain: self.name,
                code,
                len: self.values.len(),
            })
    }

    /// Translate a host string, if known.
    pub fn try_to_guest(&self, value: &str) -> Option<u32> {
        self.values.iter().position(|v| *v == value).map(|i| i as u32)
    }

    /// Translate a host string, mapping unknown strings to [`unknown`](Self::unknown).
    pub fn to_guest(&self, value: &str) -> u32 {
        self.try_to_guest(value).unwrap_or_else(|| {
            tracing::debug!(domain = self.name, value, "unrecognized enum value from host");
            self.unknown()
        })
    }
}

/// Look up a table by domain name.
pub fn by_name(name: &str) -> Option<&'static EnumTable> {
    gpu::ALL.iter().copied().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::gpu::*;
    use super::*;

    #[test]
    fn every_domain_round_trips() {
        for table in ALL {
            for code in 0..table.len() as u32 {
                let host = table.to_host(code).unwrap();
                assert_eq!(table.to_guest(host), code, "{}::{host}", table.name());
            }
        }
    }

    #[test]
    fn values_are_unique_within_a_domain() {
        for table in ALL {
            let mut values = table.values().to_vec();
            values.sort_unstable();
            values.dedup();
            assert_eq!(values.len(), table.len(), "{}", table.name());
        }
    }

    #[test]
    fn out_of_range_is_rejected_not_clamped() {
        let err = GPU_CULL_MODE.to_host(3).unwrap_err();
        assert_eq!(
            err,
            BridgeError::EnumOutOfRange {
                domain: "GpuCullMode",
                code: 3,
                len: 3
            }
        );
    }

    #[test]
    fn unknown_strings_map_to_sentinel() {
        assert_eq!(GPU_TEXTURE_FORMAT.len(), 95);
        assert_eq!(GPU_TEXTURE_FORMAT.to_guest("r64float-future"), 95);
        assert_eq!(GPU_DEVICE_LOST_REASON.to_guest("unknown"), 0);
        assert_eq!(GPU_DEVICE_LOST_REASON.to_guest("surprise"), 2);
    }

    #[test]
    fn known_positions() {
        assert_eq!(GPU_TEXTURE_FORMAT.to_guest("bgra8unorm"), 22);
        assert_eq!(GPU_TEXTURE_FORMAT.to_host(55).unwrap(), "bc7-rgba-unorm");
        assert_eq!(GPU_PRIMITIVE_TOPOLOGY.to_host(3).unwrap(), "triangle-list");
        assert_eq!(GPU_VERTEX_FORMAT.to_guest("float32x3"), 29);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(ALL.len(), 28);
        assert!(std::ptr::eq(by_name("GpuLoadOp").unwrap(), &GPU_LOAD_OP));
        assert!(by_name("GpuNothing").is_none());
    }
}
