//! System clock adapter.
//!
//! Implements [`TimeSource`] over the wall clock, with a trust flag that
//! latches the first time the clock reads a plausible synchronised time.
//!
//! - **`target_os = "espidf"`**: reads `gettimeofday()`, which SNTP
//!   keeps in sync once the network is up.
//! - **`not(target_os = "espidf")`**: uses `std::time::SystemTime`, or
//!   a pinned manual time for host-side testing and simulation.

use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::AtomicU64;

use log::info;

use crate::app::ports::TimeSource;

/// Any wall time at or below this (2021-01-01T00:00:00Z) is treated as
/// an unsynchronised RTC.
pub const SYNC_SANITY_EPOCH: u32 = 1_609_459_200;

#[cfg(not(target_os = "espidf"))]
const NOT_PINNED: u64 = u64::MAX;

pub struct SystemClock {
    trusted: AtomicBool,
    #[cfg(not(target_os = "espidf"))]
    pinned: AtomicU64,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Untrusted until [`poll_sync`](Self::poll_sync) sees a sane time.
    pub fn new() -> Self {
        Self {
            trusted: AtomicBool::new(false),
            #[cfg(not(target_os = "espidf"))]
            pinned: AtomicU64::new(NOT_PINNED),
        }
    }

    /// Latch trust once the wall clock is past [`SYNC_SANITY_EPOCH`].
    ///
    /// Returns the synchronised time on the call that latches, `None`
    /// otherwise.  Trust never reverts.
    pub fn poll_sync(&self) -> Option<u32> {
        if self.trusted.load(Ordering::Acquire) {
            return None;
        }
        let now = self.wall_seconds();
        if now <= SYNC_SANITY_EPOCH {
            return None;
        }
        if self
            .trusted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!("SystemClock: synchronised, utc={}", now);
            Some(now)
        } else {
            None
        }
    }

    /// Pin the simulated wall clock to `utc`.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_manual(&self, utc: u32) {
        self.pinned.store(u64::from(utc), Ordering::Release);
    }

    /// Return to the host's real wall clock.
    #[cfg(not(target_os = "espidf"))]
    pub fn clear_manual(&self) {
        self.pinned.store(NOT_PINNED, Ordering::Release);
    }

    #[cfg(target_os = "espidf")]
    fn wall_seconds(&self) -> u32 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid out-pointer; the timezone argument may be null.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        u32::try_from(tv.tv_sec.max(0)).unwrap_or(u32::MAX)
    }

    #[cfg(not(target_os = "espidf"))]
    fn wall_seconds(&self) -> u32 {
        let pinned = self.pinned.load(Ordering::Acquire);
        if pinned != NOT_PINNED {
            return pinned as u32;
        }
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
    }
}

impl TimeSource for SystemClock {
    fn is_time_trustworthy(&self) -> bool {
        self.trusted.load(Ordering::Acquire)
    }

    fn current_utc_seconds(&self) -> u32 {
        self.wall_seconds()
    }
}
