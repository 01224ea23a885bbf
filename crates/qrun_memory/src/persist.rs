//! Persisted state format
//!
//! Gantree: L3_Memory → Persist
//!
//! `u64` little-endian amplitude count, then one little-endian
//! `(f64 re, f64 im)` pair per amplitude.

use qrun_core::storage::{AMPLITUDE_BYTES, HEADER_BYTES};
use qrun_core::{Amplitude, QrunError, QrunResult};
use qrun_state::{decode_amplitudes, encode_amplitudes};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Serialize amplitudes to a writer
/// Gantree: write_amplitudes(W,&[Amplitude]) -> QrunResult<()> // 직렬화
pub fn write_amplitudes<W: Write>(mut writer: W, amps: &[Amplitude]) -> QrunResult<()> {
    let mut bytes = Vec::with_capacity(HEADER_BYTES + amps.len() * AMPLITUDE_BYTES);
    bytes.extend_from_slice(&(amps.len() as u64).to_le_bytes());
    encode_amplitudes(amps, &mut bytes);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Deserialize amplitudes from a reader
///
/// Fails with `CorruptState` when the header is missing or the body
/// length disagrees with it.
pub fn read_amplitudes<R: Read>(mut reader: R) -> QrunResult<Vec<Amplitude>> {
    let mut header = [0u8; HEADER_BYTES];
    reader
        .read_exact(&mut header)
        .map_err(|_| QrunError::CorruptState("missing amplitude count".to_string()))?;
    let count = u64::from_le_bytes(header);

    let expected = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(AMPLITUDE_BYTES))
        .ok_or_else(|| QrunError::CorruptState(format!("implausible count {}", count)))?;

    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;
    if body.len() != expected {
        return Err(QrunError::CorruptState(format!(
            "expected {} amplitude bytes, found {}",
            expected,
            body.len()
        )));
    }
    Ok(decode_amplitudes(&body))
}

/// Write amplitudes to `path`, replacing it atomically
///
/// Written to a sibling temp file and renamed into place.
pub fn save_to_path(path: &Path, amps: &[Amplitude]) -> QrunResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    write_amplitudes(BufWriter::new(tmp.as_file_mut()), amps)?;
    tmp.persist(path).map_err(|e| QrunError::FileError(e.to_string()))?;
    Ok(())
}

/// Read amplitudes from `path`
pub fn load_from_path(path: &Path) -> QrunResult<Vec<Amplitude>> {
    read_amplitudes(BufReader::new(File::open(path)?))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Amplitude> {
        vec![
            Amplitude::new(std::f64::consts::FRAC_1_SQRT_2, 0.0),
            Amplitude::new(-0.0, -std::f64::consts::FRAC_1_SQRT_2),
        ]
    }

    #[test]
    fn test_layout() {
        let mut bytes = Vec::new();
        write_amplitudes(&mut bytes, &sample()).unwrap();
        assert_eq!(bytes.len(), 8 + 2 * 16);
        assert_eq!(&bytes[..8], &2u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &std::f64::consts::FRAC_1_SQRT_2.to_le_bytes());
    }

    #[test]
    fn test_bit_exact_round_trip() {
        let mut bytes = Vec::new();
        write_amplitudes(&mut bytes, &sample()).unwrap();
        let back = read_amplitudes(bytes.as_slice()).unwrap();
        for (a, b) in back.iter().zip(sample()) {
            assert_eq!(a.re.to_bits(), b.re.to_bits());
            assert_eq!(a.im.to_bits(), b.im.to_bits());
        }
    }

    #[test]
    fn test_truncated_rejected() {
        let mut bytes = Vec::new();
        write_amplitudes(&mut bytes, &sample()).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            read_amplitudes(bytes.as_slice()),
            Err(QrunError::CorruptState(_))
        ));
        assert!(matches!(
            read_amplitudes(&[1u8, 2][..]),
            Err(QrunError::CorruptState(_))
        ));
    }

    #[test]
    fn test_path_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        save_to_path(&path, &sample()).unwrap();
        assert_eq!(load_from_path(&path).unwrap(), sample());

        // overwrite in place
        save_to_path(&path, &sample()[..1]).unwrap();
        assert_eq!(load_from_path(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_path(&dir.path().join("nope.bin")).unwrap_err();
        assert!(matches!(err, QrunError::FileError(_)));
    }
}
