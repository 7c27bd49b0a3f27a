//! Shared mappings of the fabric's physical register and FIFO windows.
//!
//! The backing device is opened once; each region is then mapped shared and
//! page-rounded, and accessed exclusively through volatile 32-bit loads and
//! stores so the compiler can neither reorder nor elide fabric traffic.

use std::ffi::CString;
use std::sync::Arc;

use crate::error::{Result, ShimError};

const DEV_MEM: &str = "/dev/mem";

fn page_size() -> usize { unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize } }

/// Round a word count up to whole pages, in bytes.
fn map_len(words: usize) -> usize {
    let page = page_size();
    ((words * 4 - 1) / page + 1) * page
}

/// The opened backing device. Only needed while mappings are being
/// established; the mappings themselves outlive it.
pub struct DevMem {
    fd: libc::c_int,
}

impl DevMem {
    pub fn open() -> Result<DevMem> {
        let path = CString::new(DEV_MEM).unwrap();
        let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR) };
        if fd < 0 {
            return Err(ShimError::MapUnavailable {
                path: DEV_MEM,
                err: std::io::Error::last_os_error(),
            });
        }
        Ok(DevMem { fd })
    }
}

impl Drop for DevMem {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}

/// One mapped window of `words` 32-bit registers.
///
/// Host-side aliasing is confined by construction: each FIFO data word has a
/// single producer or consumer, and status words are pure loads, so `&self`
/// access from multiple threads is sound. The fabric is the counter-party on
/// the other side of every address.
pub struct MmioRegion {
    base: *mut u32,
    words: usize,
    len: usize,
}

// Raw pointer into a shared device window; see the aliasing note above.
unsafe impl Send for MmioRegion {}
unsafe impl Sync for MmioRegion {}

impl MmioRegion {
    /// Map `words` 32-bit words of physical address space starting at `phys`.
    pub fn map(dev: &DevMem, phys: u32, words: usize) -> Result<Arc<MmioRegion>> {
        let len = map_len(words);
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                dev.fd,
                phys as libc::off_t,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(ShimError::MapFailed { addr: phys, err: std::io::Error::last_os_error() });
        }
        Ok(Arc::new(MmioRegion { base: ptr as *mut u32, words, len }))
    }

    /// An anonymous, zero-filled window of the same shape. Lets the bindings
    /// and tests run without the fabric; status words read back as zero, so
    /// every FIFO reports not-present.
    pub fn anon(words: usize) -> Arc<MmioRegion> {
        let len = map_len(words);
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        assert!(ptr != libc::MAP_FAILED, "anonymous mapping failed");
        Arc::new(MmioRegion { base: ptr as *mut u32, words, len })
    }

    pub fn words(&self) -> usize { self.words }

    #[inline]
    pub fn read(&self, offset: usize) -> u32 {
        debug_assert!(offset < self.words);
        unsafe { self.base.add(offset).read_volatile() }
    }

    #[inline]
    pub fn write(&self, offset: usize, value: u32) {
        debug_assert!(offset < self.words);
        unsafe { self.base.add(offset).write_volatile(value) }
    }
}

impl Drop for MmioRegion {
    fn drop(&mut self) {
        unsafe { libc::munmap(self.base as *mut libc::c_void, self.len) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_len_rounds_to_pages() {
        let page = page_size();
        assert_eq!(map_len(1), page);
        assert_eq!(map_len(page / 4), page);
        assert_eq!(map_len(page / 4 + 1), 2 * page);
    }

    #[test]
    fn anon_region_reads_back_writes() {
        let region = MmioRegion::anon(64);
        assert_eq!(region.read(0), 0);
        region.write(0, 0xdead_beef);
        region.write(63, 7);
        assert_eq!(region.read(0), 0xdead_beef);
        assert_eq!(region.read(63), 7);
    }
}
