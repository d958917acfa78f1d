use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, Days, NaiveDate};
use clap::Parser;
use serde::Serialize;

/// Write a deterministic influencer campaign CSV with a weekly revenue cycle.
#[derive(Debug, Parser)]
#[command(about)]
struct Args {
    /// Output file.
    #[arg(short, long, default_value = "sample_influencers.csv")]
    output: PathBuf,

    /// Number of consecutive days to simulate.
    #[arg(long, default_value_t = 56)]
    days: u64,

    /// Records per day.
    #[arg(long, default_value_t = 6)]
    per_day: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Serialize)]
struct Row {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Influencer ID")]
    influencer: String,
    #[serde(rename = "Platform")]
    platform: &'static str,
    #[serde(rename = "Product ID")]
    product: String,
    #[serde(rename = "Revenue ($)")]
    revenue: f64,
    #[serde(rename = "Cost ($)")]
    cost: f64,
    #[serde(rename = "ROI (%)")]
    roi: f64,
    #[serde(rename = "Engagement Rate (%)")]
    engagement: f64,
    #[serde(rename = "Sales Spike")]
    spike: bool,
}

const PLATFORMS: [&str; 4] = ["Instagram", "TikTok", "YouTube", "Twitter"];
const INFLUENCERS: usize = 12;
const PRODUCTS: usize = 5;

/// Revenue multiplier per weekday, Monday first. Mean is 1.
const WEEKLY: [f64; 7] = [0.85, 0.9, 0.95, 1.0, 1.1, 1.15, 1.05];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;

    // Each influencer keeps one platform and a base revenue level.
    let profiles: Vec<(&'static str, f64)> = (0..INFLUENCERS)
        .map(|_| (PLATFORMS[rng.below(PLATFORMS.len())], 400.0 + 1200.0 * rng.next_f64()))
        .collect();

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut written = 0usize;

    for day in 0..args.days {
        let date = start
            .checked_add_days(Days::new(day))
            .context("date out of range")?;
        let season = WEEKLY[date.weekday().num_days_from_monday() as usize];

        for _ in 0..args.per_day {
            let who = rng.below(INFLUENCERS);
            let (platform, base) = profiles[who];
            let spike = rng.next_f64() < 0.1;
            let lift = if spike { 1.8 } else { 1.0 };
            let revenue = (base * season * lift * (1.0 + rng.gauss(0.0, 0.08))).max(1.0);
            // Occasional unpaid posts exercise the zero-cost ROI path.
            let cost = if rng.next_f64() < 0.05 {
                0.0
            } else {
                base * (0.3 + 0.5 * rng.next_f64())
            };
            let roi = if cost > 0.0 { revenue / cost * 100.0 } else { 0.0 };

            writer.serialize(Row {
                date: date.format("%Y-%m-%d").to_string(),
                influencer: format!("INF{:03}", who + 1),
                platform,
                product: format!("P{}", rng.below(PRODUCTS) + 1),
                revenue: round2(revenue),
                cost: round2(cost),
                roi: round2(roi),
                engagement: round2((rng.gauss(4.0, 1.5)).clamp(0.2, 15.0)),
                spike,
            })?;
            written += 1;
        }
    }
    writer.flush()?;

    log::info!("generated {written} rows with seed {}", args.seed);
    println!("Wrote {written} records over {} days to {}", args.days, args.output.display());
    Ok(())
}
