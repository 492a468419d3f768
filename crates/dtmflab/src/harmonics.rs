//! Second-harmonic ratio statistics over `decode --features` dumps.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::evaluate::parse_metadata;

/// Summary of one sample of ratios, in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
}

impl Stats {
    /// `None` for an empty sample.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
        Some(Self {
            count,
            mean,
            stdev: variance.sqrt(),
            min: sorted[0],
            max: sorted[count - 1],
            p5: percentile(&sorted, 5.0),
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
        })
    }
}

/// Linear interpolation between closest ranks of an ascending, non-empty slice.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let k = (sorted.len() - 1) as f64 * pct / 100.0;
    let lower = k.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let weight = k - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Ratios split into frames that carry a digit and frames that do not.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameBuckets {
    pub digit_row: Vec<f64>,
    pub digit_col: Vec<f64>,
    pub other_row: Vec<f64>,
    pub other_col: Vec<f64>,
}

impl FrameBuckets {
    fn extend(&mut self, other: &FrameBuckets) {
        self.digit_row.extend_from_slice(&other.digit_row);
        self.digit_col.extend_from_slice(&other.digit_col);
        self.other_row.extend_from_slice(&other.other_row);
        self.other_col.extend_from_slice(&other.other_col);
    }

    fn is_empty(&self) -> bool {
        self.digit_row.is_empty() && self.other_row.is_empty()
    }

    fn render(&self, out: &mut String) {
        out.push_str(&format_bucket("digit_frames", &self.digit_row, &self.digit_col));
        out.push_str(&format_bucket("non_digit_frames", &self.other_row, &self.other_col));
    }
}

/// Bucket the rows of one feature dump.
///
/// Rows without both harmonic ratios are skipped. When `has_code` is false
/// every frame counts as a non-digit frame.
pub fn read_frames<R: Read>(reader: R, has_code: bool) -> anyhow::Result<FrameBuckets> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let (Some(row2_at), Some(col2_at)) = (column("row2_ratio_db"), column("col2_ratio_db")) else {
        bail!("missing row2_ratio_db/col2_ratio_db columns");
    };
    let emitted_at = column("emitted_digit");
    let candidate_at = column("candidate");

    let mut buckets = FrameBuckets::default();
    for record in reader.records() {
        let record = record?;
        let ratio = |at: usize| record.get(at).and_then(|cell| cell.trim().parse::<f64>().ok());
        let (Some(row2), Some(col2)) = (ratio(row2_at), ratio(col2_at)) else {
            continue;
        };
        let has_symbol =
            |at: Option<usize>| at.and_then(|i| record.get(i)).is_some_and(|cell| !cell.is_empty());

        if has_code && (has_symbol(emitted_at) || has_symbol(candidate_at)) {
            buckets.digit_row.push(row2);
            buckets.digit_col.push(col2);
        } else {
            buckets.other_row.push(row2);
            buckets.other_col.push(col2);
        }
    }
    Ok(buckets)
}

/// Bucket one dump, using its file name to decide whether digits are expected.
pub fn summarise_file(path: &Path) -> anyhow::Result<FrameBuckets> {
    let has_code = !parse_metadata(path).code.is_empty();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_frames(file, has_code).with_context(|| format!("reading {}", path.display()))
}

fn format_bucket(label: &str, row: &[f64], col: &[f64]) -> String {
    let (Some(row), Some(col)) = (Stats::from_values(row), Stats::from_values(col)) else {
        return format!("  {label}: N=0\n");
    };
    let mut out = format!("  {label}: N={}\n", row.count);
    for (name, s) in [("row2_ratio_db", row), ("col2_ratio_db", col)] {
        out.push_str(&format!(
            "    {name} mean={:.2} stdev={:.2} min={:.2} max={:.2} median={:.2} dB, 5-95%=[{:.2}, {:.2}]\n",
            s.mean, s.stdev, s.min, s.max, s.p50, s.p5, s.p95
        ));
    }
    out
}

/// Sorted `.csv` files directly inside `dir`.
fn find_dumps(dir: &Path) -> anyhow::Result<Vec<std::path::PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        let is_csv = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if entry.file_type().is_file() && is_csv {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Build the per-file and overall report for every dump in `dir`.
pub fn analyse(dir: &Path) -> anyhow::Result<String> {
    if !dir.is_dir() {
        bail!("harmonics directory not found: {}", dir.display());
    }
    let dumps = find_dumps(dir)?;
    if dumps.is_empty() {
        bail!("no CSV files found under {}", dir.display());
    }

    let mut out = String::new();
    let mut overall = FrameBuckets::default();
    for path in &dumps {
        let buckets = match summarise_file(path) {
            Ok(buckets) => buckets,
            Err(err) => {
                warn!(path = %path.display(), "skipping dump: {err:#}");
                continue;
            }
        };
        debug!(
            path = %path.display(),
            digit_frames = buckets.digit_row.len(),
            other_frames = buckets.other_row.len(),
            "summarised"
        );
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        out.push_str(&format!("File: {name}\n"));
        buckets.render(&mut out);
        out.push('\n');
        overall.extend(&buckets);
    }

    if !overall.is_empty() {
        out.push_str("Overall:\n");
        overall.render(&mut out);
    }
    Ok(out)
}

/// `analyse-harmonics` subcommand.
pub fn run(dir: &Path) -> anyhow::Result<()> {
    print!("{}", analyse(dir)?);
    Ok(())
}
