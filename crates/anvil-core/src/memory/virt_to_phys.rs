use std::fmt::{Debug, Formatter};

use log::warn;
use pagemap2::{PageMapError, VirtualMemoryArea};
use serde::Serialize;
use thiserror::Error;

use crate::util::PAGE_SHIFT;

/// Physical memory address.
#[repr(transparent)]
#[derive(Clone, Copy, Default, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysAddr(usize);

impl Debug for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("PhysAddr({:#x})", self.0))
    }
}

impl PhysAddr {
    /// Creates a new physical address.
    pub fn new(addr: usize) -> Self {
        PhysAddr(addr)
    }

    /// Returns the address as a usize.
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl From<PhysAddr> for usize {
    fn from(addr: PhysAddr) -> usize {
        addr.0
    }
}

/// Errors from pagemap lookups.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct PageMapLookupError(#[from] PageMapError);

/// Virtual to physical address translator using `/proc/self/pagemap`.
///
/// Requires root (or CAP_SYS_ADMIN); without it the kernel reports PFN 0.
pub struct LinuxPageMap {
    pagemap: pagemap2::PageMap,
}

impl LinuxPageMap {
    /// Opens the pagemap of the current process.
    ///
    /// # Errors
    ///
    /// Returns an error when `/proc/self/pagemap` cannot be opened.
    pub fn new() -> Result<LinuxPageMap, PageMapLookupError> {
        Ok(LinuxPageMap {
            pagemap: pagemap2::PageMap::new(std::process::id() as u64)?,
        })
    }

    /// Resolves a virtual address to its physical address.
    ///
    /// # Errors
    ///
    /// Returns an error when the pagemap query fails.
    pub fn get_phys(&mut self, virt: u64) -> Result<PhysAddr, PageMapLookupError> {
        let page_start = virt & !0xFFF;
        let vma = VirtualMemoryArea::from((page_start, page_start + 4095));
        let entries = self.pagemap.pagemap_vma(&vma)?;
        assert_eq!(
            entries.len(),
            1,
            "expected one pagemap entry for {:#x}, got {}",
            virt,
            entries.len()
        );
        let pfn = entries[0].pfn()?;
        if pfn == 0 {
            warn!("PFN 0 for virtual address {:#x}; are we root?", virt);
        }
        Ok(PhysAddr(((pfn << PAGE_SHIFT) | (virt & 0xFFF)) as usize))
    }
}
