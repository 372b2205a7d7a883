//! Write a synthetic raw listings CSV for trying the cleaning step locally.
//!
//! The file mimics the raw NYC listings export: a handful of price and
//! location outliers, rows without reviews, and review dates in more than one
//! spelling.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;

#[derive(Parser)]
#[command(name = "generate_sample", about = "Generate a sample raw listings CSV")]
struct Args {
    /// Output path
    #[arg(short, long, default_value = "sample.csv")]
    output: PathBuf,

    /// Number of listings
    #[arg(long, default_value_t = 500)]
    rows: usize,

    /// PRNG seed; same seed, same file
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const HEADER: [&str; 16] = [
    "id",
    "name",
    "host_id",
    "host_name",
    "neighbourhood_group",
    "neighbourhood",
    "latitude",
    "longitude",
    "room_type",
    "price",
    "minimum_nights",
    "number_of_reviews",
    "last_review",
    "reviews_per_month",
    "calculated_host_listings_count",
    "availability_365",
];

/// (group, neighbourhood, latitude, longitude) anchors.
const NEIGHBOURHOODS: [(&str, &str, f64, f64); 6] = [
    ("Brooklyn", "Williamsburg", 40.7081, -73.9571),
    ("Brooklyn", "Bedford-Stuyvesant", 40.6872, -73.9418),
    ("Manhattan", "Harlem", 40.8116, -73.9465),
    ("Manhattan", "Midtown", 40.7549, -73.9840),
    ("Queens", "Astoria", 40.7644, -73.9235),
    ("Bronx", "Mott Haven", 40.8091, -73.9229),
];

const ROOM_TYPES: [&str; 3] = ["Entire home/apt", "Private room", "Shared room"];
const HOSTS: [&str; 5] = ["John", "Maria", "Jennifer", "Michael", "Sonder (NYC)"];

/// SplitMix64: enough randomness for sample data, reproducible per seed.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }
}

fn listing(id: usize, last_scrape: NaiveDate, rng: &mut SplitMix64) -> Vec<String> {
    let (group, hood, lat0, lon0) = NEIGHBOURHOODS[rng.below(NEIGHBOURHOODS.len())];
    let room = ROOM_TYPES[rng.below(ROOM_TYPES.len())];
    let host = HOSTS[rng.below(HOSTS.len())];

    let (mut lat, mut lon) = (
        lat0 + (rng.unit() - 0.5) * 0.04,
        lon0 + (rng.unit() - 0.5) * 0.04,
    );
    // ~2% geocoded somewhere outside the metro area
    if rng.chance(0.02) {
        lat += 1.5;
        lon -= 0.9;
    }

    let base = match room {
        "Entire home/apt" => 180.0,
        "Private room" => 80.0,
        _ => 45.0,
    };
    let mut price = (base * (0.5 + rng.unit())).round() as i64;
    // ~3% priced absurdly high, ~1% free
    if rng.chance(0.03) {
        price *= 250;
    } else if rng.chance(0.01) {
        price = 0;
    }

    let reviews = if rng.chance(0.2) { 0 } else { 1 + rng.below(120) };
    let (last_review, per_month) = if reviews == 0 {
        (String::new(), String::new())
    } else {
        let day = last_scrape - Duration::days(rng.below(1500) as i64);
        let spelled = if rng.chance(0.1) {
            day.format("%Y-%m-%d 00:00:00").to_string()
        } else {
            day.format("%Y-%m-%d").to_string()
        };
        (spelled, format!("{:.2}", 0.05 + rng.unit() * 4.0))
    };

    vec![
        (2539 + id * 17).to_string(),
        format!("{room} in {hood}, listing {id}"),
        (2787 + rng.below(90_000_000)).to_string(),
        host.to_string(),
        group.to_string(),
        hood.to_string(),
        format!("{lat:.5}"),
        format!("{lon:.5}"),
        room.to_string(),
        price.to_string(),
        (1 + rng.below(30)).to_string(),
        reviews.to_string(),
        last_review,
        per_month,
        (1 + rng.below(5)).to_string(),
        rng.below(366).to_string(),
    ]
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SplitMix64(args.seed);
    let last_scrape = NaiveDate::from_ymd_opt(2019, 7, 8).context("invalid scrape date")?;

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    writer.write_record(HEADER)?;
    for id in 0..args.rows {
        writer.write_record(listing(id, last_scrape, &mut rng))?;
    }
    writer.flush()?;

    println!("Wrote {} listings to {}", args.rows, args.output.display());
    Ok(())
}
