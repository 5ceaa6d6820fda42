/// Simple benchmark for the batched x16r chain
/// Measures 4-way and 8-way scanner throughput on one thread

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use x16r_miner::algorithms::HashSuite;
use x16r_miner::backend::create_backend;
use x16r_miner::mining::{BlockHeader, Target, WorkItem};
use x16r_miner::x16r::{NullSink, ScanConfig, X16rOrder};

fn main() -> anyhow::Result<()> {
    println!("═════════════════════════════════════════════");
    println!("  x16r Chain Throughput Benchmark");
    println!("═════════════════════════════════════════════");
    println!();

    let suite = Arc::new(HashSuite::with_stand_ins());
    let stand_ins: Vec<&str> = suite.stand_ins().iter().map(|a| a.name()).collect();
    println!("Stand-ins: {}", stand_ins.join(", "));
    println!();

    let mut bytes = [0u8; 80];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(13);
    }
    let header = BlockHeader::from_bytes(bytes);
    let work = WorkItem::new("bench", header, Target::MAX);
    let config = ScanConfig { benchmark: true, ..Default::default() };
    let restart = AtomicBool::new(false);

    let test_nonces: Vec<u32> = vec![1_024, 4_096, 16_384];

    println!("{:<8} {:<10} {:<12} {:<12}", "Lanes", "Nonces", "Time (ms)", "kH/s");
    println!("{:-<8} {:-<10} {:-<12} {:-<12}", "", "", "", "");

    for lanes in [4usize, 8] {
        let mut backend = create_backend(lanes, suite.clone(), Box::new(X16rOrder), config)?;

        // Warm-up run
        backend.mine_job(&work, 256, &restart, &NullSink)?;

        for &nonces in &test_nonces {
            let start = Instant::now();
            let result = backend.mine_job(&work, nonces, &restart, &NullSink)?;
            let secs = start.elapsed().as_secs_f64();
            let rate = result.hashes_computed as f64 / secs / 1_000.0;
            println!("{:<8} {:<10} {:<12.1} {:<12.2}", lanes, result.hashes_computed, secs * 1_000.0, rate);
        }
    }

    Ok(())
}
