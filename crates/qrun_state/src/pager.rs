//! Disk-backed amplitude store
//!
//! Gantree: L2_State → DiskPager
//!
//! Keeps at most one page of amplitudes resident. The backing file
//! is a scratch temp file that is flushed and deleted on drop.

use qrun_core::storage::{AMPLITUDE_BYTES, DEFAULT_PAGE_ELEMS};
use qrun_core::{Amplitude, QrunError, QrunResult};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;

// ============================================================================
// Amplitude Codec
// ============================================================================

/// Append amplitudes as little-endian `(re, im)` f64 pairs
pub fn encode_amplitudes(amps: &[Amplitude], out: &mut Vec<u8>) {
    out.reserve(amps.len() * AMPLITUDE_BYTES);
    for a in amps {
        out.extend_from_slice(&a.re.to_le_bytes());
        out.extend_from_slice(&a.im.to_le_bytes());
    }
}

/// Decode little-endian `(re, im)` f64 pairs; trailing partial pairs are ignored
pub fn decode_amplitudes(bytes: &[u8]) -> Vec<Amplitude> {
    bytes
        .chunks_exact(AMPLITUDE_BYTES)
        .map(|pair| {
            let mut re = [0u8; 8];
            let mut im = [0u8; 8];
            re.copy_from_slice(&pair[..8]);
            im.copy_from_slice(&pair[8..]);
            Amplitude::new(f64::from_le_bytes(re), f64::from_le_bytes(im))
        })
        .collect()
}

// ============================================================================
// DiskPager
// ============================================================================

/// Page-granular amplitude store over a temporary file
/// Gantree: DiskPager // 디스크 페이저
pub struct DiskPager {
    file: NamedTempFile,
    len: usize,
    page_elems: usize,
    buffer: Vec<Amplitude>,
    current: Option<usize>,
    dirty: bool,
}

impl DiskPager {
    /// Create a zero-filled store of `len` amplitudes
    /// Gantree: new(len,page_elems) -> QrunResult<Self> // 임시 파일 생성
    pub fn new(len: usize, page_elems: usize) -> QrunResult<Self> {
        if page_elems == 0 {
            return Err(QrunError::InvalidConfig(
                "page_elems must be positive".to_string(),
            ));
        }

        let file = tempfile::Builder::new()
            .prefix("qrun_pager")
            .tempfile()?;
        file.as_file().set_len(Self::byte_len(len))?;

        log::debug!(
            "Paging {} amplitudes to {} ({} per page)",
            len,
            file.path().display(),
            page_elems
        );

        Ok(Self {
            file,
            len,
            page_elems,
            buffer: vec![Amplitude::new(0.0, 0.0); page_elems],
            current: None,
            dirty: false,
        })
    }

    /// Create with the default page size
    pub fn with_default_pages(len: usize) -> QrunResult<Self> {
        Self::new(len, DEFAULT_PAGE_ELEMS)
    }

    fn byte_len(elems: usize) -> u64 {
        (elems * AMPLITUDE_BYTES) as u64
    }

    fn page_span(&self, page: usize) -> (u64, usize) {
        let start = page * self.page_elems;
        let count = self.page_elems.min(self.len - start);
        (Self::byte_len(start), count)
    }

    fn check_index(&self, idx: usize) -> QrunResult<()> {
        if idx >= self.len {
            return Err(QrunError::IndexOutOfRange {
                index: idx,
                dim: self.len,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Paging
    // ========================================================================

    fn load_page(&mut self, page: usize) -> QrunResult<()> {
        if self.current == Some(page) {
            return Ok(());
        }
        self.flush()?;

        let (offset, count) = self.page_span(page);
        let mut bytes = vec![0u8; count * AMPLITUDE_BYTES];
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut bytes)?;

        for (slot, amp) in self.buffer.iter_mut().zip(decode_amplitudes(&bytes)) {
            *slot = amp;
        }
        self.current = Some(page);
        Ok(())
    }

    /// Write the resident page back if it was modified
    pub fn flush(&mut self) -> QrunResult<()> {
        let page = match self.current {
            Some(p) if self.dirty => p,
            _ => return Ok(()),
        };

        let (offset, count) = self.page_span(page);
        let mut bytes = Vec::new();
        encode_amplitudes(&self.buffer[..count], &mut bytes);
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&bytes)?;
        self.dirty = false;
        Ok(())
    }

    // ========================================================================
    // Element Access
    // ========================================================================

    /// Read one amplitude, paging it in if needed
    pub fn read(&mut self, idx: usize) -> QrunResult<Amplitude> {
        self.check_index(idx)?;
        self.load_page(idx / self.page_elems)?;
        Ok(self.buffer[idx % self.page_elems])
    }

    /// Write one amplitude, paging it in if needed
    pub fn write(&mut self, idx: usize, value: Amplitude) -> QrunResult<()> {
        self.check_index(idx)?;
        self.load_page(idx / self.page_elems)?;
        self.buffer[idx % self.page_elems] = value;
        self.dirty = true;
        Ok(())
    }

    /// Read one amplitude without changing the resident page
    pub fn peek(&self, idx: usize) -> QrunResult<Amplitude> {
        self.check_index(idx)?;
        let page = idx / self.page_elems;
        if self.current == Some(page) {
            return Ok(self.buffer[idx % self.page_elems]);
        }

        let mut file: &File = self.file.as_file();
        let mut bytes = [0u8; AMPLITUDE_BYTES];
        file.seek(SeekFrom::Start(Self::byte_len(idx)))?;
        file.read_exact(&mut bytes)?;
        Ok(decode_amplitudes(&bytes)[0])
    }

    /// Copy out every amplitude, including unflushed page writes
    pub fn snapshot(&self) -> QrunResult<Vec<Amplitude>> {
        let mut file: &File = self.file.as_file();
        let mut bytes = vec![0u8; self.len * AMPLITUDE_BYTES];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut bytes)?;
        let mut amps = decode_amplitudes(&bytes);

        if let Some(page) = self.current {
            let start = page * self.page_elems;
            let count = self.page_elems.min(self.len - start);
            amps[start..start + count].copy_from_slice(&self.buffer[..count]);
        }
        Ok(amps)
    }

    /// Overwrite every amplitude; `amps` must hold exactly `len()` values
    pub fn store_all(&mut self, amps: &[Amplitude]) -> QrunResult<()> {
        if amps.len() != self.len {
            return Err(QrunError::ShapeMismatch {
                expected: self.len,
                actual: amps.len(),
            });
        }
        let mut bytes = Vec::new();
        encode_amplitudes(amps, &mut bytes);
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&bytes)?;
        self.current = None;
        self.dirty = false;
        Ok(())
    }

    /// Zero every amplitude
    pub fn reset(&mut self) -> QrunResult<()> {
        let file = self.file.as_file();
        file.set_len(0)?;
        file.set_len(Self::byte_len(self.len))?;
        self.current = None;
        self.dirty = false;
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of amplitudes stored
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the store holds no amplitudes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Amplitudes per page
    pub fn page_elems(&self) -> usize {
        self.page_elems
    }

    /// Bytes held in memory (one page)
    pub fn resident_bytes(&self) -> usize {
        self.page_elems * AMPLITUDE_BYTES
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for DiskPager {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("Failed to flush pager {}: {}", self.path().display(), e);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Amplitude {
        Amplitude::new(re, im)
    }

    #[test]
    fn test_new_is_zeroed() {
        let mut pager = DiskPager::new(10, 4).unwrap();
        for i in 0..10 {
            assert_eq!(pager.read(i).unwrap(), c(0.0, 0.0));
        }
    }

    #[test]
    fn test_write_survives_page_switch() {
        let mut pager = DiskPager::new(10, 4).unwrap();
        pager.write(1, c(0.5, -0.5)).unwrap();
        pager.write(9, c(1.0, 2.0)).unwrap();
        assert_eq!(pager.read(1).unwrap(), c(0.5, -0.5));
        assert_eq!(pager.read(9).unwrap(), c(1.0, 2.0));
    }

    #[test]
    fn test_peek_sees_flushed_and_resident_values() {
        let mut pager = DiskPager::new(8, 2).unwrap();
        pager.write(0, c(1.0, 0.0)).unwrap();
        pager.write(7, c(0.0, 1.0)).unwrap();
        assert_eq!(pager.peek(0).unwrap(), c(1.0, 0.0));
        assert_eq!(pager.peek(7).unwrap(), c(0.0, 1.0));
        assert_eq!(pager.peek(3).unwrap(), c(0.0, 0.0));
    }

    #[test]
    fn test_out_of_range() {
        let mut pager = DiskPager::new(4, 2).unwrap();
        assert!(matches!(
            pager.read(4),
            Err(QrunError::IndexOutOfRange { index: 4, dim: 4 })
        ));
        assert!(pager.peek(100).is_err());
    }

    #[test]
    fn test_reset_zeroes() {
        let mut pager = DiskPager::new(6, 4).unwrap();
        pager.write(5, c(3.0, 0.0)).unwrap();
        pager.reset().unwrap();
        assert_eq!(pager.read(5).unwrap(), c(0.0, 0.0));
    }

    #[test]
    fn test_file_removed_on_drop() {
        let pager = DiskPager::new(4, 2).unwrap();
        let path = pager.path().to_path_buf();
        assert!(path.exists());
        drop(pager);
        assert!(!path.exists());
    }

    #[test]
    fn test_snapshot_includes_dirty_page() {
        let mut pager = DiskPager::new(5, 2).unwrap();
        pager.write(4, c(0.0, -1.0)).unwrap();
        let snap = pager.snapshot().unwrap();
        assert_eq!(snap.len(), 5);
        assert_eq!(snap[4], c(0.0, -1.0));
    }

    #[test]
    fn test_store_all() {
        let mut pager = DiskPager::new(3, 2).unwrap();
        pager.write(0, c(9.0, 9.0)).unwrap();
        pager.store_all(&[c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0)]).unwrap();
        assert_eq!(pager.read(0).unwrap(), c(1.0, 0.0));
        assert_eq!(pager.read(2).unwrap(), c(3.0, 0.0));
        assert!(matches!(
            pager.store_all(&[c(1.0, 0.0)]),
            Err(QrunError::ShapeMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_zero_page_rejected() {
        assert!(matches!(
            DiskPager::new(4, 0),
            Err(QrunError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_codec() {
        let amps = vec![c(1.5, -2.0), c(0.0, 0.25)];
        let mut bytes = Vec::new();
        encode_amplitudes(&amps, &mut bytes);
        assert_eq!(bytes.len(), 32);
        assert_eq!(decode_amplitudes(&bytes), amps);
    }
}
