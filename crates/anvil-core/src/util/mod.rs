//! Utility functions and types used throughout the Anvil framework.
//!
//! This module provides various helper types and functions including:
//! - Constants for memory operations ([`PAGE_SIZE`], [`ROW_SIZE`], etc.)
//! - The run-level random source ([`RunRng`])
//! - Process scheduling helpers ([`raise_process_priority`], [`yield_cpu`])
//! - Byte-count formatting for the log ([`format_bytes`])

mod constants;
mod rng;

pub use self::constants::*;
pub use self::rng::RunRng;

use log::warn;

/// Gives this process the highest CPU priority so calibration and hammering
/// run with as few interruptions as possible.
///
/// Requires CAP_SYS_NICE (or root); failure is logged but not fatal, the
/// fuzzer merely becomes noisier.
pub fn raise_process_priority() {
    let ret = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, -20) };
    if ret != 0 {
        warn!(
            "setpriority(-20) failed: {}",
            std::io::Error::last_os_error()
        );
    }
}

/// Yields the CPU so measurement loops get pre-empted at loop boundaries
/// rather than mid-measurement.
pub fn yield_cpu() {
    unsafe {
        libc::sched_yield();
    }
}

/// Renders a byte count with the largest binary unit that divides it evenly,
/// so superpage-sized values read as "1 GiB" and odd counts stay exact.
///
/// # Examples
///
/// ```
/// use anvil_core::util::format_bytes;
///
/// assert_eq!(format_bytes(1 << 30), "1 GiB");
/// assert_eq!(format_bytes(256 << 20), "256 MiB");
/// assert_eq!(format_bytes(8200), "8200 bytes");
/// ```
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [(usize, &str); 3] = [(1 << 30, "GiB"), (1 << 20, "MiB"), (1 << 10, "KiB")];
    for (unit, suffix) in UNITS {
        if bytes >= unit && bytes.is_multiple_of(unit) {
            return format!("{} {}", bytes / unit, suffix);
        }
    }
    format!("{} bytes", bytes)
}

#[cfg(test)]
mod tests {
    use super::format_bytes;

    #[test]
    fn byte_counts_use_the_largest_exact_unit() {
        assert_eq!(format_bytes(1 << 30), "1 GiB");
        assert_eq!(format_bytes(2 << 30), "2 GiB");
        assert_eq!(format_bytes(4 << 20), "4 MiB");
        assert_eq!(format_bytes((1 << 30) + (512 << 20)), "1536 MiB");
        assert_eq!(format_bytes(8192), "8 KiB");
        assert_eq!(format_bytes(100), "100 bytes");
        assert_eq!(format_bytes(0), "0 bytes");
    }
}
