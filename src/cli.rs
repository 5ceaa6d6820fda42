use clap::{Parser, ValueEnum};
use colored::*;

/// Order derivation to mine with
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    X16r,
    X16s,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::X16r => "x16r",
            Variant::X16s => "x16s",
        }
    }
}

/// x16r-miner - vectorized x16r/x16s CPU miner
#[derive(Parser, Debug)]
#[command(name = "x16r-miner")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Vectorized x16r/x16s CPU nonce scanner written in Rust", long_about = None)]
pub struct Args {
    /// Hash order variant
    #[arg(short, long, value_enum, default_value = "x16r", value_name = "ALGORITHM")]
    pub algo: Variant,

    /// Nonces hashed per chain call (4 or 8)
    #[arg(short, long, default_value_t = 8, value_parser = parse_lanes)]
    pub lanes: usize,

    /// Number of mining threads (default: available cores)
    #[arg(short, long, value_name = "THREADS")]
    pub threads: Option<usize>,

    /// 80-byte block header as hex (required unless --benchmark)
    #[arg(long, value_name = "HEX")]
    pub header: Option<String>,

    /// Compact target (hex nbits); defaults to the header's bits field
    #[arg(long, value_name = "NBITS", conflicts_with = "target")]
    pub nbits: Option<String>,

    /// Full 256-bit target as big-endian hex
    #[arg(long, value_name = "HEX")]
    pub target: Option<String>,

    /// First nonce to try
    #[arg(long, default_value_t = 0)]
    pub start_nonce: u32,

    /// Hash against the fixed benchmark target and never report shares
    #[arg(short, long)]
    pub benchmark: bool,

    /// Fill primitives without an implementation with stand-ins
    #[arg(long)]
    pub stand_ins: bool,

    /// Nonces per scan call before stats are reported
    #[arg(long, default_value_t = 0x10_0000, value_name = "NONCES")]
    pub chunk_size: u32,

    /// Stop each worker's scan at its first share
    #[arg(long)]
    pub stop_on_share: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

fn parse_lanes(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n @ (4 | 8)) => Ok(n),
        Ok(n) => Err(format!("{} lanes not supported, use 4 or 8", n)),
        Err(e) => Err(e.to_string()),
    }
}

pub fn display_banner() {
    let rule = "═".repeat(58);
    println!();
    println!("{}", format!("╔{}╗", rule).bright_cyan());
    println!("{}  {}", "║".bright_cyan(), "x16r-miner - Vectorized Hash Chain Miner".bright_white().bold());
    println!(
        "{}  {}",
        "║".bright_cyan(),
        format!("   Version {} | x16r + x16s | 4/8 lanes", env!("CARGO_PKG_VERSION")).bright_green()
    );
    println!("{}", format!("╚{}╝", rule).bright_cyan());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["x16r-miner", "--benchmark", "-l", "4", "-a", "x16s"]);
        assert!(args.benchmark);
        assert_eq!(args.lanes, 4);
        assert_eq!(args.algo, Variant::X16s);
        assert_eq!(args.chunk_size, 0x10_0000);
    }

    #[test]
    fn test_rejects_unsupported_lanes() {
        assert!(Args::try_parse_from(["x16r-miner", "--lanes", "2"]).is_err());
    }

    #[test]
    fn test_nbits_conflicts_with_target() {
        let res = Args::try_parse_from(["x16r-miner", "--nbits", "1d00ffff", "--target", "ff"]);
        assert!(res.is_err());
    }
}
