//! Host import tables.
//!
//! Each submodule contributes one static table of [`Thunk`]s. Import names
//! are unique across all tables because they share one import module.

pub mod basis;
pub mod dom;
pub mod gpu;
pub mod js;

use crate::marshal::{Thunk, register_thunks};
use crate::state::BridgeState;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tether_core::error::Result;
use wasmtime::Linker;

/// Every table, in registration order.
pub static TABLES: &[&[Thunk]] = &[js::THUNKS, gpu::THUNKS, basis::THUNKS, dom::THUNKS];

static INDEX: Lazy<HashMap<&'static str, &'static Thunk>> = Lazy::new(|| {
    TABLES
        .iter()
        .flat_map(|table| table.iter())
        .map(|thunk| (thunk.import, thunk))
        .collect()
});

/// Register every table under `module`.
pub fn register_all(linker: &mut Linker<BridgeState>, module: &str) -> Result<()> {
    for &table in TABLES {
        register_thunks(linker, module, table)?;
    }
    Ok(())
}

/// Look up a thunk by import name.
pub fn find(import: &str) -> Option<&'static Thunk> {
    INDEX.get(import).copied()
}

/// Total number of thunks.
pub fn count() -> usize {
    TABLES.iter().map(|table| table.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::{Param, Ret};
    use std::collections::HashSet;
    use tether_core::enums::gpu::ALL;

    #[test]
    fn import_names_are_unique() {
        let mut seen = HashSet::new();
        for table in TABLES {
            for thunk in table.iter() {
                assert!(seen.insert(thunk.import), "duplicate import {}", thunk.import);
            }
        }
        assert_eq!(seen.len(), count());
    }

    #[test]
    fn every_gpu_enum_domain_is_reachable() {
        let mut used = HashSet::new();
        for thunk in TABLES.iter().flat_map(|t| t.iter()) {
            for param in thunk.params {
                if let Param::Enum(table) | Param::OptEnum(table) = param {
                    used.insert(table.name());
                }
            }
            if let Ret::Enum(table) = thunk.ret {
                used.insert(table.name());
            }
        }
        for table in ALL {
            assert!(used.contains(table.name()), "{} is never marshalled", table.name());
        }
    }

    #[test]
    fn lookup_by_import() {
        let thunk = find("__wbg_transcodeImage").unwrap();
        assert!(matches!(thunk.params[1], Param::U8SpanMut));
        assert!(find("__wbg_createBuffer").unwrap().catch);
        assert!(find("__wbg_nonexistent").is_none());
    }
}
