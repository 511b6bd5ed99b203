use compress::gzip::{compress_to_vec, decompress_to_vec, CompressionLevel, CountingGzDecoder, CountingGzEncoder};
use std::io::Read;

#[test]
fn manifest_sized_payload_round_trips_through_best_compression() {
    let payload: Vec<u8> = (0..512 * 1024)
        .map(|i| ((i / 4096) % 251) as u8)
        .collect();
    let compressed = compress_to_vec(&payload, CompressionLevel::Best).expect("compress");
    assert!(compressed.len() < payload.len());
    let decompressed = decompress_to_vec(&compressed).expect("decompress");
    assert_eq!(decompressed, payload);
}

#[test]
fn none_level_still_produces_a_valid_gzip_stream() {
    let payload = b"package manifest entries go here".repeat(16);
    let compressed = compress_to_vec(&payload, CompressionLevel::None).expect("compress");
    let decompressed = decompress_to_vec(&compressed).expect("decompress");
    assert_eq!(decompressed, payload);
}

#[test]
fn streaming_encoder_output_is_consumable_by_streaming_decoder() {
    let mut encoder = CountingGzEncoder::with_sink(Vec::new(), CompressionLevel::Fast);
    let chunks = [
        b"chunk one of the package stream".as_slice(),
        b"chunk two continues the stream",
        b"final chunk closes out the file",
    ];
    for chunk in chunks {
        encoder.write(chunk).expect("write chunk");
    }
    let (compressed, compressed_len) = encoder.finish_into_inner().expect("finish stream");
    assert_eq!(compressed_len, compressed.len() as u64);

    let mut decoder = CountingGzDecoder::new(compressed.as_slice());
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).expect("decode stream");
    assert_eq!(decoded, chunks.concat());
    assert_eq!(decoder.bytes_read(), decoded.len() as u64);
}

#[test]
fn corrupted_stream_is_rejected_by_the_decoder() {
    let payload = b"package contents that will be corrupted after compression";
    let mut compressed = compress_to_vec(payload, CompressionLevel::Default).expect("compress");
    let last = compressed.len() - 1;
    compressed[last] ^= 0xFF;
    let result = decompress_to_vec(&compressed);
    assert!(result.is_err());
}
