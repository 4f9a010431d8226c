//! Free-memory check run before a table is downloaded and parsed.

use tracing::{debug, warn};

use super::{human_size, FileEntry};
use crate::error::KaggleEaseError;

/// Reports how many bytes the process could still allocate.
pub trait MemoryProbe: Send + Sync {
    /// `None` when the platform does not report it.
    fn available_bytes(&self) -> Option<u64>;
}

/// Reads available memory from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemMemory;

impl MemoryProbe for SystemMemory {
    fn available_bytes(&self) -> Option<u64> {
        let mut system = sysinfo::System::new();
        system.refresh_memory();
        let available = system.available_memory();
        (available > 0).then_some(available)
    }
}

/// Fails when `entry` is larger than available memory; warns past half of it.
pub fn ensure_fits(entry: &FileEntry, memory: &dyn MemoryProbe) -> Result<(), KaggleEaseError> {
    let Some(available) = memory.available_bytes() else {
        debug!(file = %entry.name, "available memory unknown, skipping check");
        return Ok(());
    };

    if entry.size_bytes > available {
        return Err(KaggleEaseError::data_format(format!(
            "'{}' is {} but only {} of memory is available",
            entry.name,
            human_size(entry.size_bytes),
            human_size(available)
        ))
        .with_fix_suggestion("pick a smaller file with file=, or free memory and retry"));
    }
    if entry.size_bytes > available / 2 {
        warn!(
            file = %entry.name,
            size = entry.size_bytes,
            available,
            "table uses more than half of available memory"
        );
    }
    Ok(())
}
