use x16r_miner::mining::{nbits_to_target, Target};

/// Little-endian hash whose 256-bit value equals the big-endian `be`
fn hash_from_be(be: [u8; 32]) -> [u8; 32] {
    let mut hash = be;
    hash.reverse();
    hash
}

#[test]
fn test_target_calculation() {
    let nbits = 0x1a020bcfu32;
    let target = nbits_to_target(nbits);

    println!("nbits: 0x{:08x}", nbits);
    println!("target bytes: {}", hex::encode(target));

    // exponent 0x1a = 26, so the mantissa starts at byte 32 - 26
    let offset = 32 - 26;
    assert_eq!(&target[offset..offset + 3], &[0x02, 0x0b, 0xcf]);
    assert!(target[..offset].iter().all(|&b| b == 0));
    assert!(target[offset + 3..].iter().all(|&b| b == 0));
}

#[test]
fn test_compact_target_words() {
    let target = Target::from_compact(0x1d00ffff);
    println!("genesis target: {:?}", target);
    assert_eq!(target.words()[0], 0x0000_0000);
    assert_eq!(target.words()[1], 0xffff_0000);
    assert!(target.words()[2..].iter().all(|&w| w == 0));
}

#[test]
fn test_hash_just_below_and_above_target() {
    let target_be = nbits_to_target(0x1d00ffff);
    let target = Target::from_be_bytes(&target_be);

    // Equal counts as meeting the target
    let equal = hash_from_be(target_be);
    assert!(target.passes_coarse(&equal));
    assert!(target.is_met_by(&equal));

    let mut below = target_be;
    below[5] = 0xfe;
    assert!(target.is_met_by(&hash_from_be(below)));

    let mut above = target_be;
    above[31] = 0x01;
    let above = hash_from_be(above);
    println!("above: {}", hex::encode(above));
    assert!(target.passes_coarse(&above));
    assert!(!target.is_met_by(&above));
}

#[test]
fn test_coarse_filter_rejects_large_top_word() {
    let target = Target::from_compact(0x1d00ffff);
    let mut be = [0u8; 32];
    be[3] = 0x01;
    let hash = hash_from_be(be);
    assert!(!target.passes_coarse(&hash));
    assert!(!target.is_met_by(&hash));
}

#[test]
fn test_benchmark_target() {
    let target = Target::BENCHMARK;
    assert_eq!(target.msw(), 0x0000_0cff);
    assert!(target.words()[1..].iter().all(|&w| w == 0xffff_ffff));
    println!("benchmark target: {:?}", target);
}
