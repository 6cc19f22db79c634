use std::io::Write;

use flate2::{write::ZlibEncoder, Compression, Decompress, FlushDecompress, Status};

use crate::error::{Error, Result};

const CHUNK: usize = 8 * 1024;

/// Wraps a record in a zlib stream.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Unwraps a zlib stream. Anything short of a complete, well-formed stream
/// is a [`Error::CorruptRecord`].
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(bytes.len().saturating_mul(2).max(CHUNK));
    loop {
        if out.len() == out.capacity() {
            out.reserve(CHUNK);
        }
        let (in_before, out_before) = (inflater.total_in(), inflater.total_out());
        let status = inflater
            .decompress_vec(&bytes[in_before as usize..], &mut out, FlushDecompress::None)
            .map_err(|err| Error::CorruptRecord(err.to_string()))?;
        if status == Status::StreamEnd {
            return Ok(out);
        }
        let stalled = inflater.total_in() == in_before && inflater.total_out() == out_before;
        if stalled && out.len() < out.capacity() {
            return Err(Error::CorruptRecord(format!(
                "compressed stream ends early after {} of {} bytes",
                inflater.total_in(),
                bytes.len()
            )));
        }
    }
}

#[test]
fn test_round_trip() {
    let record = b"blob 12\0hello, world".to_vec();
    let packed = compress(&record).unwrap();
    assert_ne!(packed, record);
    assert_eq!(decompress(&packed).unwrap(), record);
}

#[test]
fn test_large_round_trip() {
    let record: Vec<u8> = (0..100_000u32).map(|i| (i * 7 % 251) as u8).collect();
    assert_eq!(decompress(&compress(&record).unwrap()).unwrap(), record);
}

#[test]
fn test_round_trip_across_sizes() {
    for n in [1_000usize, 8_192, 8_193, 10_000, 20_000, 50_000] {
        let record: Vec<u8> = b"line of ordinary text\n".iter().copied().cycle().take(n).collect();
        assert_eq!(decompress(&compress(&record).unwrap()).unwrap(), record, "{} bytes", n);
    }
}

#[test]
fn test_empty_round_trip() {
    assert_eq!(decompress(&compress(b"").unwrap()).unwrap(), b"");
}

#[test]
fn test_garbage_is_corrupt() {
    let err = decompress(b"this was never zlib").unwrap_err();
    assert!(matches!(err, Error::CorruptRecord(_)), "{:?}", err);
}

#[test]
fn test_truncated_is_corrupt() {
    let packed = compress(b"tree 0\0 some content long enough to matter").unwrap();
    let err = decompress(&packed[..packed.len() / 2]).unwrap_err();
    assert!(matches!(err, Error::CorruptRecord(_)), "{:?}", err);
    assert!(matches!(decompress(b"").unwrap_err(), Error::CorruptRecord(_)));
}
