use std::ptr::null_mut;

use lazy_static::lazy_static;
use libc::{MAP_ANONYMOUS, MAP_HUGETLB, MAP_POPULATE, MAP_SHARED, O_CREAT, O_RDWR, c_void};
use log::{debug, info, warn};
use thiserror::Error;

use super::{BitFlip, DataPattern, expected_page};
use crate::timing;
use crate::util::{PAGE_SIZE, format_bytes};

/// hugetlbfs-backed file used for the superpage mapping
const HUGETLBFS_PATH: &str = "/mnt/huge/buff";

const MAP_HUGE_SHIFT: i32 = 26;
const MAP_HUGE_1GB: i32 = 30 << MAP_HUGE_SHIFT;

const MEMINFO_PATH: &str = "/proc/meminfo";
const HUGEPAGESIZE_TOKEN: &str = "Hugepagesize:";

lazy_static! {
    /// Default hugepage size configured on this system, in bytes (-1 when it
    /// cannot be determined).
    static ref HUGEPAGE_SIZE: isize = {
        let buf = std::fs::read_to_string(MEMINFO_PATH).unwrap_or_default();
        parse_hugepage_size(&buf)
    };
}

fn parse_hugepage_size(meminfo: &str) -> isize {
    for line in meminfo.lines() {
        let Some(rest) = line.strip_prefix(HUGEPAGESIZE_TOKEN) else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let mut size = parts.next().unwrap_or("0").parse::<isize>().unwrap_or(-1);
        size *= parts.next().map_or(1, |unit| match unit {
            "kB" => 1024,
            _ => 1,
        });
        return size;
    }
    -1
}

/// Errors that can occur while allocating or scanning a memory region.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// All superpage/hugepage allocation attempts failed
    #[error("superpage unavailable: {0}")]
    SuperpageUnavailable(std::io::Error),
    /// Scan range is not within the region
    #[error("range [{start:#x}, {end:#x}) outside region of {len:#x} bytes")]
    RangeOutOfBounds {
        /// start offset of the rejected range
        start: usize,
        /// end offset of the rejected range
        end: usize,
        /// region length
        len: usize,
    },
}

enum Backing {
    Superpage,
    Hugepages,
    Aligned,
    Borrowed,
}

/// A physically contiguous virtual memory region.
///
/// Preferably backed by a 1 GB superpage so that the low 30 bits of a virtual
/// address equal the low 30 bits of its physical address, which is what makes
/// the DRAM matrix functions applicable to virtual addresses. The region owns
/// its mapping and unmaps on drop.
pub struct MemoryRegion {
    ptr: *mut u8,
    len: usize,
    backing: Backing,
}

unsafe impl Send for MemoryRegion {}

impl MemoryRegion {
    /// Allocates a region of `len` bytes at the fixed virtual address `base`.
    ///
    /// With `want_superpage`, first tries a 1 GB hugetlb page backed by
    /// [`HUGETLBFS_PATH`]; if that fails, anonymous 1 GB hugetlb; if that also
    /// fails, falls back to an aligned allocation promoted to huge pages by
    /// khugepaged (which requires a grace period before the promotion has
    /// happened).
    ///
    /// # Errors
    ///
    /// [`MemoryError::SuperpageUnavailable`] when every strategy failed.
    pub fn allocate(
        len: usize,
        want_superpage: bool,
        base: *mut c_void,
    ) -> Result<Self, MemoryError> {
        assert!(len.is_multiple_of(PAGE_SIZE));

        if want_superpage {
            let default_hp = *HUGEPAGE_SIZE;
            if default_hp > 0 {
                debug!("system default hugepage size: {} bytes", default_hp);
            } else {
                warn!("could not determine hugepage size from {}", MEMINFO_PATH);
            }
            match Self::map_superpage(len, base) {
                Ok(region) => return Ok(region),
                Err(e) => warn!("superpage allocation failed ({}), trying fallbacks", e),
            }
            match Self::map_anon_hugetlb(len, base) {
                Ok(region) => return Ok(region),
                Err(e) => warn!("anonymous hugetlb allocation failed ({}), trying madvise", e),
            }
        }

        Self::alloc_aligned(len)
    }

    fn map_superpage(len: usize, base: *mut c_void) -> Result<Self, std::io::Error> {
        let path = std::ffi::CString::new(HUGETLBFS_PATH).expect("static path");
        let fd = unsafe { libc::open(path.as_ptr(), O_RDWR | O_CREAT, 0o666) };
        if fd == -1 {
            return Err(std::io::Error::last_os_error());
        }
        let p = unsafe {
            libc::mmap(
                base,
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                MAP_SHARED | MAP_POPULATE | MAP_HUGETLB | MAP_HUGE_1GB,
                fd,
                0,
            )
        };
        unsafe { libc::close(fd) };
        if p == libc::MAP_FAILED {
            return Err(std::io::Error::last_os_error());
        }
        if p != base {
            warn!("superpage mapped at {:p} instead of requested {:p}", p, base);
        }
        info!("allocated {} as 1 GB superpage at {:p}", format_bytes(len), p);
        Ok(MemoryRegion {
            ptr: p as *mut u8,
            len,
            backing: Backing::Superpage,
        })
    }

    fn map_anon_hugetlb(len: usize, base: *mut c_void) -> Result<Self, std::io::Error> {
        let p = unsafe {
            libc::mmap(
                base,
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                MAP_SHARED | MAP_ANONYMOUS | MAP_POPULATE | MAP_HUGETLB | MAP_HUGE_1GB,
                -1,
                0,
            )
        };
        if p == libc::MAP_FAILED {
            return Err(std::io::Error::last_os_error());
        }
        info!("allocated {} as anonymous hugetlb at {:p}", format_bytes(len), p);
        Ok(MemoryRegion {
            ptr: p as *mut u8,
            len,
            backing: Backing::Hugepages,
        })
    }

    fn alloc_aligned(len: usize) -> Result<Self, MemoryError> {
        let mut p: *mut c_void = null_mut();
        let ret = unsafe { libc::posix_memalign(&mut p, len, len) };
        if ret != 0 || p.is_null() {
            return Err(MemoryError::SuperpageUnavailable(
                std::io::Error::from_raw_os_error(ret),
            ));
        }
        unsafe {
            libc::madvise(p, len, libc::MADV_HUGEPAGE);
            libc::memset(p, b'A' as i32, len);
        }
        // khugepaged needs time to collapse the region into huge pages
        info!("waiting for khugepaged");
        std::thread::sleep(std::time::Duration::from_secs(10));
        Ok(MemoryRegion {
            ptr: p as *mut u8,
            len,
            backing: Backing::Aligned,
        })
    }

    /// Creates a region view over caller-provided memory, for tests.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid for `len` bytes for the lifetime of the returned
    /// region, which will NOT free it.
    #[doc(hidden)]
    pub unsafe fn from_raw_parts_for_test(ptr: *mut u8, len: usize) -> Self {
        MemoryRegion {
            ptr,
            len,
            backing: Backing::Borrowed,
        }
    }

    /// Allocates a small region whose base is aligned like a superpage, so
    /// DRAM coordinate translations stay inside it. For tests that exercise
    /// the address model without real hugepages.
    #[doc(hidden)]
    pub fn anon_aligned_for_test(len: usize, align: usize) -> Self {
        let mut p: *mut c_void = null_mut();
        let ret = unsafe { libc::posix_memalign(&mut p, align, len) };
        assert_eq!(ret, 0, "posix_memalign({align:#x}, {len:#x}) failed");
        unsafe { libc::memset(p, 0, len) };
        MemoryRegion {
            ptr: p as *mut u8,
            len,
            backing: Backing::Aligned,
        }
    }

    /// Returns a pointer to the byte at `offset`.
    pub fn addr(&self, offset: usize) -> *mut u8 {
        assert!(
            offset < self.len,
            "offset {} out of bounds ({})",
            offset,
            self.len
        );
        unsafe { self.ptr.byte_add(offset) }
    }

    /// Returns the base pointer of the region.
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Returns the region length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the region is empty (never the case after `allocate`).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the byte offset of `addr` inside the region, if it lies within.
    pub fn offset_of(&self, addr: *const u8) -> Option<usize> {
        let base = self.ptr as usize;
        let a = addr as usize;
        (a >= base && a < base + self.len).then(|| a - base)
    }

    /// Resolves the physical address of the region base via
    /// `/proc/self/pagemap`.
    ///
    /// # Errors
    ///
    /// Returns an error when the pagemap cannot be read (usually: not root).
    pub fn phys_base(&self) -> Result<super::PhysAddr, super::PageMapLookupError> {
        super::LinuxPageMap::new()?.get_phys(self.ptr as u64)
    }

    /// Writes the reproducible fill over the whole region.
    ///
    /// After this, every 4-byte word at page `p`, word index `j` equals the
    /// `j`-th output of the fill generator seeded with `p * PAGE_SIZE`
    /// (see [`super::FillLcg`]).
    pub fn initialize(&self, pattern: DataPattern) {
        info!("initializing {} bytes with {:?} fill", self.len, pattern);
        let mut page = vec![0u8; PAGE_SIZE];
        for page_index in 0..self.len / PAGE_SIZE {
            expected_page(pattern, page_index, &mut page);
            unsafe {
                std::ptr::copy_nonoverlapping(
                    page.as_ptr(),
                    self.addr(page_index * PAGE_SIZE),
                    PAGE_SIZE,
                );
            }
        }
        debug!("memory init done");
    }

    /// Compares `[start_off, end_off)` against the reproducible fill and
    /// reports every corrupted byte through `on_flip`.
    ///
    /// Offsets are rounded outward to page boundaries. Cache lines are
    /// flushed before reading so the comparison sees DRAM content, not cached
    /// copies. Corrupted bytes are restored to their expected value (and
    /// flushed again) so that a subsequent scan of the same range reports the
    /// same flips. Returns the total number of corrupted bits.
    ///
    /// # Errors
    ///
    /// [`MemoryError::RangeOutOfBounds`] when the range does not fit the
    /// region.
    pub fn check_range(
        &self,
        start_off: usize,
        end_off: usize,
        pattern: DataPattern,
        on_flip: &mut dyn FnMut(BitFlip),
    ) -> Result<usize, MemoryError> {
        if start_off > end_off || end_off > self.len {
            return Err(MemoryError::RangeOutOfBounds {
                start: start_off,
                end: end_off,
                len: self.len,
            });
        }
        let first_page = start_off / PAGE_SIZE;
        let last_page = end_off.div_ceil(PAGE_SIZE);

        let mut corrupted_bits = 0;
        let mut expected = vec![0u8; PAGE_SIZE];
        for page_index in first_page..last_page {
            expected_page(pattern, page_index, &mut expected);
            let page_base = page_index * PAGE_SIZE;

            unsafe {
                for line_off in (0..PAGE_SIZE).step_by(crate::util::CL_SIZE) {
                    timing::flush(self.addr(page_base + line_off));
                }
                timing::fence_full();

                // fast path: unchanged pages are skipped without a byte-wise walk
                let cmp = libc::memcmp(
                    self.addr(page_base) as *const c_void,
                    expected.as_ptr() as *const c_void,
                    PAGE_SIZE,
                );
                if cmp == 0 {
                    continue;
                }

                debug!("page {} miscompares, locating flipped bytes", page_index);
                for (i, &exp) in expected.iter().enumerate() {
                    let addr = self.addr(page_base + i);
                    let observed = *addr;
                    if observed != exp {
                        let flip = BitFlip::new(addr, observed ^ exp, observed);
                        corrupted_bits += flip.count_bit_corruptions();
                        on_flip(flip);
                        // restore so later scans and aggressors see the expected value
                        *addr = exp;
                        timing::flush(addr);
                        timing::fence_full();
                    }
                }
            }
        }
        Ok(corrupted_bits)
    }
}

impl Drop for MemoryRegion {
    fn drop(&mut self) {
        match self.backing {
            Backing::Superpage | Backing::Hugepages => unsafe {
                libc::munmap(self.ptr as *mut c_void, self.len);
            },
            Backing::Aligned => unsafe {
                libc::free(self.ptr as *mut c_void);
            },
            Backing::Borrowed => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::PAGE_SIZE;

    fn test_region(pages: usize) -> (Vec<u8>, MemoryRegion) {
        let mut buf = vec![0u8; pages * PAGE_SIZE];
        let region =
            unsafe { MemoryRegion::from_raw_parts_for_test(buf.as_mut_ptr(), buf.len()) };
        (buf, region)
    }

    #[test]
    fn test_initialize_matches_expected_fill() {
        let (_buf, region) = test_region(4);
        region.initialize(DataPattern::Random);
        let mut expected = vec![0u8; PAGE_SIZE];
        for page in 0..4 {
            expected_page(DataPattern::Random, page, &mut expected);
            let actual =
                unsafe { std::slice::from_raw_parts(region.addr(page * PAGE_SIZE), PAGE_SIZE) };
            assert_eq!(actual, &expected[..]);
        }
    }

    #[test]
    fn test_check_range_clean_region() {
        let (_buf, region) = test_region(2);
        region.initialize(DataPattern::Random);
        let mut flips = vec![];
        let n = region
            .check_range(0, region.len(), DataPattern::Random, &mut |f| flips.push(f))
            .unwrap();
        assert_eq!(n, 0);
        assert!(flips.is_empty());
    }

    #[test]
    fn test_check_range_detects_and_restores_single_flip() {
        let (_buf, region) = test_region(1);
        region.initialize(DataPattern::Random);

        let offset = 2048;
        let original = unsafe { *region.addr(offset) };
        unsafe { *region.addr(offset) = !original };

        let mut flips = vec![];
        let n = region
            .check_range(0, region.len(), DataPattern::Random, &mut |f| flips.push(f))
            .unwrap();
        assert_eq!(flips.len(), 1);
        assert_eq!(n, 8);
        assert_eq!(flips[0].addr, region.addr(offset) as usize);
        assert_eq!(flips[0].bitmask, original ^ !original);
        assert_eq!(flips[0].data, !original);

        // the corrupted byte must have been restored
        assert_eq!(unsafe { *region.addr(offset) }, original);
        let n = region
            .check_range(0, region.len(), DataPattern::Random, &mut |_| {})
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_check_range_rejects_bad_range() {
        let (_buf, region) = test_region(1);
        assert!(
            region
                .check_range(0, 2 * PAGE_SIZE, DataPattern::Random, &mut |_| {})
                .is_err()
        );
    }

    #[test]
    fn test_parse_hugepage_size() {
        assert_eq!(parse_hugepage_size("Hugepagesize:1024"), 1024);
        assert_eq!(parse_hugepage_size("Hugepagesize: 2048 kB"), 2048 * 1024);
        assert_eq!(parse_hugepage_size("MemTotal: 32 kB"), -1);
        assert_eq!(parse_hugepage_size(""), -1);
    }
}
