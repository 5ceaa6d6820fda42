use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;

mod cli;

use cli::{display_banner, Args, Variant};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use x16r_miner::algorithms::{HashSuite, HashSuiteBuilder};
use x16r_miner::backend::{create_backend, MiningBackend};
use x16r_miner::mining::{nbits_to_difficulty, BlockHeader, MiningStats, Target, WorkItem, BITS_WORD, HEADER_LEN};
use x16r_miner::x16r::{OrderDerivation, ScanConfig, Share, ShareSink, StopReason, X16rOrder, X16sOrder};

/// Hashrate samples over a sliding time window
#[derive(Debug, Clone)]
pub struct MovingAverage {
    samples: VecDeque<(Instant, f64)>,
    max_samples: usize,
}

impl MovingAverage {
    fn new() -> Self {
        Self {
            samples: VecDeque::new(),
            max_samples: 1000,
        }
    }

    fn update(&mut self, hashrate: f64) {
        let now = Instant::now();
        self.samples.push_back((now, hashrate));

        let one_hour_ago = now - Duration::from_secs(3600);
        while self.samples.front().is_some_and(|(time, _)| *time < one_hour_ago) {
            self.samples.pop_front();
        }
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Average over the last `window_secs`; falls back to the newest sample
    fn get_average(&self, window_secs: u64) -> f64 {
        let cutoff = Instant::now() - Duration::from_secs(window_secs);
        let (sum, count) = self
            .samples
            .iter()
            .filter(|(time, _)| *time >= cutoff)
            .fold((0.0, 0usize), |(sum, count), (_, rate)| (sum + rate, count + 1));

        if count == 0 {
            return self.samples.back().map(|(_, rate)| *rate).unwrap_or(0.0);
        }
        sum / count as f64
    }
}

/// Per-thread statistics
#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub worker: usize,
    pub hashes: u64,
    pub shares_found: u64,
    pub moving_avg: MovingAverage,
    pub last_sample_hashes: u64,
    pub last_sample_time: Instant,
    pub finished: bool,
}

impl WorkerStats {
    pub fn new(worker: usize) -> Self {
        Self {
            worker,
            hashes: 0,
            shares_found: 0,
            moving_avg: MovingAverage::new(),
            last_sample_hashes: 0,
            last_sample_time: Instant::now(),
            finished: false,
        }
    }

    /// Sample hashrate from cumulative hashes; call about once a second
    pub fn sample_hashrate(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_sample_time).as_secs_f64();
        if elapsed < 0.1 {
            return;
        }

        let delta = self.hashes.saturating_sub(self.last_sample_hashes);
        let hashrate = delta as f64 / elapsed;
        self.moving_avg.update(hashrate);
        tracing::trace!("worker #{} sampled {} hashes in {:.3}s = {:.2} kH/s",
            self.worker, delta, elapsed, hashrate / 1_000.0);

        self.last_sample_hashes = self.hashes;
        self.last_sample_time = now;
    }
}

/// Messages from mining threads to the UI loop
#[derive(Debug)]
enum WorkerEvent {
    StatsUpdate { worker: usize, hashes: u64, elapsed_ms: u64 },
    ShareFound { worker: usize, job_id: String, share: Share },
    Error { worker: usize, error: String },
    Finished { worker: usize },
}

/// Forwards shares from the scanner to the UI loop
struct ChannelSink {
    worker: usize,
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl ShareSink for ChannelSink {
    fn submit(&self, work: &WorkItem, share: Share) {
        let event = WorkerEvent::ShareFound { worker: self.worker, job_id: work.job_id.clone(), share };
        if self.tx.send(event).is_err() {
            tracing::warn!("worker #{}: share for nonce {:08x} dropped, UI loop gone", self.worker, share.nonce);
        }
    }
}

/// Nonce range owned by one worker
#[derive(Debug, Clone, Copy)]
struct NonceRange {
    start: u32,
    end: u32,
}

/// Split `[start, u32::MAX]` into at most `threads` disjoint lane-aligned ranges.
/// Fewer ranges come back when there are not enough batches left for every thread.
fn split_nonce_space(start: u32, threads: usize, lanes: usize) -> Vec<NonceRange> {
    let lanes = lanes as u32;
    let remaining = u32::MAX - start;
    let threads = (threads as u32).clamp(1, (remaining / lanes).max(1));
    let span = (remaining / threads) & !(lanes - 1);
    (0..threads)
        .map(|i| {
            let begin = start + i * span;
            let end = if i + 1 == threads { u32::MAX } else { begin + span };
            NonceRange { start: begin, end }
        })
        .collect()
}

struct WorkerSetup {
    worker: usize,
    backend: Box<dyn MiningBackend>,
    work: WorkItem,
    range: NonceRange,
    chunk: u32,
    wrap: bool,
    restart: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

/// Blocking scan loop for one thread
fn run_worker(setup: WorkerSetup) {
    let WorkerSetup { worker, mut backend, work, range, chunk, wrap, restart, tx } = setup;
    let sink = ChannelSink { worker, tx: tx.clone() };
    let mut nonce = range.start;

    tracing::info!("worker #{} scanning {:08x}..{:08x} ({})",
        worker, range.start, range.end, backend.device_info().name);

    while !restart.load(Ordering::Relaxed) {
        let max_nonce = nonce.saturating_add(chunk).min(range.end);
        let job = work.clone().with_start_nonce(nonce);

        let result = match backend.mine_job(&job, max_nonce, &restart, &sink) {
            Ok(result) => result,
            Err(e) => {
                let _ = tx.send(WorkerEvent::Error { worker, error: format!("{:#}", e) });
                break;
            }
        };

        let _ = tx.send(WorkerEvent::StatsUpdate {
            worker,
            hashes: result.hashes_computed,
            elapsed_ms: result.elapsed_ms,
        });

        if result.stop == StopReason::Cancelled {
            break;
        }
        if result.stop == StopReason::ShareFound {
            tracing::info!("worker #{} stopping at first share", worker);
            break;
        }

        if result.hashes_computed == 0 {
            tracing::info!("worker #{} has no full batch left in its range", worker);
            break;
        }

        nonce = result.next_nonce;
        if nonce >= range.end || result.next_nonce <= job.start_nonce {
            if !wrap {
                tracing::info!("worker #{} exhausted its nonce range", worker);
                break;
            }
            nonce = range.start;
        }
    }

    let _ = tx.send(WorkerEvent::Finished { worker });
}

/// Header used when benchmarking without a real job
fn benchmark_header() -> BlockHeader {
    let mut bytes = [0u8; HEADER_LEN];
    for (i, b) in bytes.iter_mut().enumerate().take(68) {
        *b = (i as u8).wrapping_mul(37).wrapping_add(11);
    }
    let mut header = BlockHeader::from_bytes(bytes);
    header.set_word(0, 0x2000_0000);
    header.set_time(chrono::Utc::now().timestamp() as u32);
    header.set_word(BITS_WORD, 0x1d00_ffff);
    header
}

fn derivation_for(variant: Variant) -> Box<dyn OrderDerivation> {
    match variant {
        Variant::X16r => Box::new(X16rOrder),
        Variant::X16s => Box::new(X16sOrder),
    }
}

fn build_suite(args: &Args) -> Result<HashSuite> {
    if args.benchmark || args.stand_ins {
        let suite = HashSuite::with_stand_ins();
        if !args.benchmark {
            tracing::warn!("stand-in primitives in use, shares will not validate on a real network");
        }
        return Ok(suite);
    }
    HashSuiteBuilder::rustcrypto()
        .build()
        .context("incomplete primitive suite (use --benchmark or --stand-ins)")
}

/// Target to scan against, plus the compact bits it came from (if any)
fn resolve_target(args: &Args, header: &BlockHeader) -> Result<(Target, Option<u32>)> {
    if let Some(ref hex) = args.target {
        return Ok((Target::from_hex(hex)?, None));
    }
    let nbits = match args.nbits {
        Some(ref s) => u32::from_str_radix(s.trim_start_matches("0x"), 16)
            .with_context(|| format!("invalid nbits {:?}", s))?,
        None => header.bits(),
    };
    if nbits == 0 {
        bail!("no target: header bits are zero and neither --nbits nor --target was given");
    }
    Ok((Target::from_compact(nbits), Some(nbits)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
        )
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    display_banner();

    let header = match args.header {
        Some(ref hex) => BlockHeader::from_hex(hex)?,
        None if args.benchmark => benchmark_header(),
        None => {
            eprintln!("{}", "Error: --header is required unless --benchmark is set".red().bold());
            std::process::exit(1);
        }
    };
    let (target, nbits) = resolve_target(&args, &header)?;
    let suite = Arc::new(build_suite(&args)?);

    let threads = args
        .threads
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
        .max(1);
    let chunk = (args.chunk_size & !(args.lanes as u32 - 1)).max(args.lanes as u32 * 2);

    println!("\n{}", "=== Mining Configuration ===".cyan().bold());
    println!("{:<15} {}", "Algorithm:".green(), args.algo.name().bright_white());
    println!("{:<15} {}", "Lanes:".green(), args.lanes.to_string().bright_white());
    println!("{:<15} {}", "Threads:".green(), threads.to_string().bright_white());
    println!("{:<15} {}", "Mode:".green(),
        if args.benchmark { "benchmark".yellow() } else { "search".bright_white() });
    if !args.benchmark {
        match nbits {
            Some(bits) => println!("{:<15} {:?} (diff {:.4})", "Target:".green(), target, nbits_to_difficulty(bits)),
            None => println!("{:<15} {:?}", "Target:".green(), target),
        }
    }
    let has_stand_ins = suite.has_stand_ins();
    let stand_ins = suite.stand_ins();
    if !stand_ins.is_empty() {
        let names: Vec<&str> = stand_ins.iter().map(|a| a.name()).collect();
        println!("{:<15} {}", "Stand-ins:".green(), names.join(", ").yellow());
    }
    println!();

    let config = ScanConfig { benchmark: args.benchmark, stop_on_share: args.stop_on_share };
    let work = WorkItem::new(if args.benchmark { "bench" } else { "cli" }, header, target);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let ranges = split_nonce_space(args.start_nonce, threads, args.lanes);
    if ranges.len() < threads {
        tracing::warn!("only {} nonce batches left, running {} of {} threads",
            ranges.len(), ranges.len(), threads);
    }
    let threads = ranges.len();
    let mut restart_flags = Vec::with_capacity(threads);
    let mut handles = Vec::with_capacity(threads);

    for (worker, range) in ranges.into_iter().enumerate() {
        let backend = create_backend(args.lanes, suite.clone(), derivation_for(args.algo), config)?;
        let restart = Arc::new(AtomicBool::new(false));
        restart_flags.push(restart.clone());

        let setup = WorkerSetup {
            worker,
            backend,
            work: work.clone(),
            range,
            chunk,
            wrap: args.benchmark,
            restart,
            tx: tx.clone(),
        };
        handles.push(tokio::task::spawn_blocking(move || run_worker(setup)));
    }
    drop(tx);

    // Ctrl+C raises every worker's restart flag
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", "Interrupt signal received, shutting down...".yellow().bold());
                for flag in &restart_flags {
                    flag.store(true, Ordering::Relaxed);
                }
            }
            Err(err) => eprintln!("Unable to listen for shutdown signal: {}", err),
        }
    });

    let mut stats: Vec<WorkerStats> = (0..threads).map(WorkerStats::new).collect();
    let mut global_stats = MiningStats::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    WorkerEvent::StatsUpdate { worker, hashes, elapsed_ms } => {
                        tracing::trace!("worker #{}: {} hashes in {} ms", worker, hashes, elapsed_ms);
                        stats[worker].hashes += hashes;
                        global_stats.hashes += hashes;
                        global_stats.batches += hashes / args.lanes as u64;
                    }
                    WorkerEvent::ShareFound { worker, job_id, share } => {
                        stats[worker].shares_found += 1;
                        global_stats.shares_found += 1;
                        let label = if has_stand_ins { "share (stand-in, not valid)".yellow() } else { "share".green() };
                        println!("[{}] {} job {} worker #{} lane {} nonce {:08x}",
                            chrono::Local::now().format("%H:%M:%S"),
                            label.bold(),
                            job_id, worker, share.lane, share.nonce);
                        println!("   {} {}", "Hash:".green(), hex::encode(share.hash));
                    }
                    WorkerEvent::Error { worker, error } => {
                        eprintln!("   {} worker #{} error: {}", "x".red(), worker, error);
                    }
                    WorkerEvent::Finished { worker } => {
                        stats[worker].finished = true;
                        tracing::debug!("worker #{} finished", worker);
                    }
                }
            }
            _ = ticker.tick() => {
                for worker in stats.iter_mut() {
                    worker.sample_hashrate();
                }
                ticks += 1;
                if ticks % 10 == 0 {
                    print_stats(&stats, &global_stats, start_time, args.algo.name());
                }
            }
        }
    }

    for handle in handles {
        handle.await.context("mining thread panicked")?;
    }

    println!("\n{}", "=== Final Statistics ===".cyan().bold());
    println!("   {} {}", "Total Hashes:".green(), global_stats.hashes);
    println!("   {} {}", "Batches:".green(), global_stats.batches);
    println!("   {} {}", "Shares Found:".green(), global_stats.shares_found);
    let secs = start_time.elapsed().as_secs_f64();
    if secs > 0.0 {
        println!("   {} {:.2} kH/s", "Average:".green(), global_stats.hashes as f64 / secs / 1_000.0);
    }

    Ok(())
}

fn print_stats(workers: &[WorkerStats], global_stats: &MiningStats, start_time: Instant, algo: &str) {
    use std::fmt::Write as _;

    let mut buf = String::new();
    writeln!(buf, "--------------------------[Statistics]--------------------------").ok();
    writeln!(buf, " ID       10s kH/s     60s kH/s          Hashes  Shares").ok();
    writeln!(buf, "----------------------------------------------------------------").ok();

    let mut total10 = 0.0;
    let mut total60 = 0.0;
    for w in workers {
        let rate10 = w.moving_avg.get_average(10);
        let rate60 = w.moving_avg.get_average(60);
        total10 += rate10;
        total60 += rate60;
        writeln!(buf, " #{:<3} {:>12.2} {:>12.2} {:>15} {:>7}{}",
            w.worker, rate10 / 1_000.0, rate60 / 1_000.0, w.hashes, w.shares_found,
            if w.finished { "  done" } else { "" }).ok();
    }
    writeln!(buf, "----------------------------------------------------------------").ok();
    writeln!(buf, " {:<4} {:>12.2} {:>12.2} {:>15} {:>7}",
        algo, total10 / 1_000.0, total60 / 1_000.0, global_stats.hashes, global_stats.shares_found).ok();

    let total_seconds = start_time.elapsed().as_secs();
    writeln!(buf, "[{:02}:{:02}:{:02}]---------------------------------------------[ver. {}]",
        total_seconds / 3600, (total_seconds % 3600) / 60, total_seconds % 60,
        env!("CARGO_PKG_VERSION")).ok();

    println!("{}", buf);
}
