use std::sync::Arc;

use x16r_miner::algorithms::HashSuite;
use x16r_miner::mining::{BlockHeader, HASH_LEN, HEADER_LEN};
use x16r_miner::x16r::{
    hash_one, AlgorithmOrder, CapabilityTable, ChainExecutor, OrderCache, X16sOrder,
};

fn sample_headers(count: usize, salt: u8) -> Vec<BlockHeader> {
    (0..count)
        .map(|lane| {
            let mut bytes = [0u8; HEADER_LEN];
            for (i, b) in bytes.iter_mut().enumerate() {
                *b = (i as u8).wrapping_mul(29).wrapping_add(salt);
            }
            let mut header = BlockHeader::from_bytes(bytes);
            header.set_nonce(0x0100_0000 * salt as u32 + lane as u32);
            header
        })
        .collect()
}

fn orders() -> Vec<AlgorithmOrder> {
    ["0123456789ABCDEF", "FEDCBA9876543210", "77777777BBBBBBBB", "3C5A0F19E2D4B687"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect()
}

#[test]
fn test_eight_four_and_scalar_agree() {
    let suite = Arc::new(HashSuite::with_stand_ins());
    let mut eight = ChainExecutor::<8>::new(suite.clone());
    let mut four = ChainExecutor::<4>::new(suite.clone());
    let mut scalar = ChainExecutor::<8>::with_table(suite.clone(), CapabilityTable::scalar(8)).unwrap();

    for (salt, order) in orders().into_iter().enumerate() {
        let headers = sample_headers(8, salt as u8 + 1);
        let batch8: [BlockHeader; 8] = std::array::from_fn(|i| headers[i]);

        let mut out8 = [[0u8; HASH_LEN]; 8];
        let mut out_scalar = [[0u8; HASH_LEN]; 8];
        eight.hash_headers(&batch8, &order, &mut out8);
        scalar.hash_headers(&batch8, &order, &mut out_scalar);

        let mut out4 = [[0u8; HASH_LEN]; 8];
        for half in 0..2 {
            let batch4: [BlockHeader; 4] = std::array::from_fn(|i| headers[half * 4 + i]);
            let mut out = [[0u8; HASH_LEN]; 4];
            four.hash_headers(&batch4, &order, &mut out);
            out4[half * 4..half * 4 + 4].copy_from_slice(&out);
        }

        for lane in 0..8 {
            let reference = hash_one(&suite, &headers[lane], &order);
            println!("{} lane {}: {}", order, lane, hex::encode(reference));
            assert_eq!(out8[lane], reference, "8-way, order {} lane {}", order, lane);
            assert_eq!(out4[lane], reference, "4-way, order {} lane {}", order, lane);
            assert_eq!(out_scalar[lane], reference, "scalar, order {} lane {}", order, lane);
        }
    }
}

#[test]
fn test_x16s_order_from_header() {
    let suite = Arc::new(HashSuite::with_stand_ins());
    let headers = sample_headers(4, 9);
    let mut cache = OrderCache::new(Box::new(X16sOrder));
    let order = cache.resolve(&headers[0]).unwrap();

    // x16s runs each primitive exactly once
    let mut seen = [false; 16];
    for algo in order.iter() {
        assert!(!seen[algo.index()], "{} repeated in {}", algo, order);
        seen[algo.index()] = true;
    }

    let batch: [BlockHeader; 4] = std::array::from_fn(|i| headers[i]);
    let mut out = [[0u8; HASH_LEN]; 4];
    ChainExecutor::<4>::new(suite.clone()).hash_headers(&batch, &order, &mut out);
    for (lane, header) in headers.iter().enumerate() {
        assert_eq!(out[lane], hash_one(&suite, header, &order));
    }
}
