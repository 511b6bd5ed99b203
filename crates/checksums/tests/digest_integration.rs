use checksums::strong::{Sha256, Xxh64};
use checksums::{hash_file, RollingChecksum};
use std::io::Write;

#[test]
fn rolling_checksum_tracks_a_sliding_window_over_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blob.bin");
    let data: Vec<u8> = (0..5000_u32).map(|i| (i % 256) as u8).collect();
    std::fs::write(&path, &data).unwrap();

    let window = 64;
    let mut rolling = RollingChecksum::new();
    rolling.update(&data[..window]);

    for offset in 0..(data.len() - window) {
        rolling
            .roll(data[offset], data[offset + window])
            .unwrap();
        let expected = {
            let mut r = RollingChecksum::new();
            r.update(&data[offset + 1..offset + 1 + window]);
            r.value()
        };
        assert_eq!(rolling.value(), expected);
    }
}

#[test]
fn hash_file_xxh64_matches_in_memory_digest_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.bin");
    let mut f = std::fs::File::create(&path).unwrap();
    let data = vec![0x42_u8; 3 * 1024 * 1024];
    f.write_all(&data).unwrap();
    drop(f);

    let digest = hash_file::<Xxh64>(&path).unwrap();
    assert_eq!(digest, Xxh64::digest(0, &data));
}

#[test]
fn hash_file_sha256_matches_in_memory_digest_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest-entry.bin");
    std::fs::write(&path, b"steamroll package contents").unwrap();

    let digest = hash_file::<Sha256>(&path).unwrap();
    assert_eq!(digest, Sha256::digest(b"steamroll package contents"));
}

#[test]
fn strong_digest_hex_round_trips_through_manifest_style_formatting() {
    let digest = Xxh64::digest(0, b"fixture");
    let hex = Xxh64::to_hex(digest);
    assert_eq!(hex.len(), 16);
    assert_eq!(hex, format!("{:016x}", u64::from_le_bytes(digest)));
}
