use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{json, Value};

use wcon_canon::{load_file, LoadOptions};

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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

const SKELETON_POINTS: usize = 11;
const FRAMES_PER_CHUNK: usize = 20;
const CHUNKS: usize = 3;
const FRAME_RATE: f64 = 10.0;

/// Rounded to 4 decimals so values survive the JSON round trip unchanged.
fn round4(v: f64) -> f64 {
    (v * 1e4).round() / 1e4
}

/// Skeleton of one worm at one frame: a sine wave along its body, relative
/// to the worm's origin offset.
fn skeleton(phase: f64, heading: f64, rng: &mut SimpleRng) -> (Vec<f64>, Vec<f64>) {
    (0..SKELETON_POINTS)
        .map(|i| {
            let s = i as f64 * 0.1;
            let lateral = 0.05 * (phase + s * 6.0).sin() + rng.gauss(0.0, 0.002);
            let x = s * heading.cos() - lateral * heading.sin();
            let y = s * heading.sin() + lateral * heading.cos();
            (round4(x), round4(y))
        })
        .unzip()
}

/// Record of one worm over `frames`. Each frame has its own seed, so a frame
/// shared by two chunks is re-reported identically.
fn worm_record(worm: i64, frames: std::ops::RangeInclusive<usize>) -> Value {
    let mut t = Vec::new();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut ox = Vec::new();
    let mut oy = Vec::new();
    for frame in frames {
        let mut rng = SimpleRng::new(worm as u64 * 1_000_003 + frame as u64);
        let heading = 0.3 * worm as f64;
        let (x, y) = skeleton(frame as f64 * 0.4, heading, &mut rng);
        t.push(round4(frame as f64 / FRAME_RATE));
        xs.push(x);
        ys.push(y);
        ox.push(round4(worm as f64 * 2.0 + frame as f64 * 0.01 * heading.cos()));
        oy.push(round4(frame as f64 * 0.01 * heading.sin()));
    }
    json!({ "id": worm, "t": t, "x": xs, "y": ys, "ox": ox, "oy": oy, "head": "L" })
}

fn chunk_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("sample_{index}.wcon"))
}

fn main() -> Result<()> {
    let dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| ".".to_string()));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    for chunk in 1..=CHUNKS {
        let first = (chunk - 1) * FRAMES_PER_CHUNK;
        // Each chunk repeats the last frame of the previous one.
        let frames = first.saturating_sub(1)..=first + FRAMES_PER_CHUNK - 1;
        let prev = if chunk > 1 { json!([format!("_{}", chunk - 1)]) } else { Value::Null };
        let next = if chunk < CHUNKS { json!([format!("_{}", chunk + 1)]) } else { Value::Null };

        let doc = json!({
            "tracker-commons": true,
            "units": { "t": "s", "x": "mm", "y": "mm", "ox": "mm", "oy": "mm" },
            "metadata": {
                "who": "generate_sample",
                "software": { "name": "wcon-canon", "version": wcon_canon::VERSION }
            },
            "files": { "this": format!("_{chunk}"), "prev": prev, "next": next },
            "data": [worm_record(1, frames.clone()), worm_record(2, frames)]
        });

        let path = chunk_path(&dir, chunk);
        let text = serde_json::to_string_pretty(&doc)?;
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    }

    let loaded = load_file(&chunk_path(&dir, 2), &LoadOptions::default())?;
    let rows = loaded.worm.table().map_or(0, |t| t.num_rows());
    println!(
        "Wrote {CHUNKS} chunks of {FRAMES_PER_CHUNK} frames to {}",
        dir.display()
    );
    println!("Merged table: {rows} rows, {SKELETON_POINTS} points per skeleton");
    Ok(())
}
