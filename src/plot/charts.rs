use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};

use super::canvas::Canvas;
use crate::color::{BLACK, ColorMap, ORANGE, generate_palette, with_alpha};
use crate::data::filter::partition_by;
use crate::data::model::{Table, Value};
use crate::report::SummaryRow;
use crate::stats::quantile_sorted;

pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 600;

/// Points sampled along each density curve.
const KDE_POINTS: usize = 200;

/// Share of a category slot covered by its box or bar cluster.
const SLOT_WIDTH: f64 = 0.8;

/// Present metric values per group, each series sorted ascending.
fn group_series(table: &Table, metric: &str, group_column: &str) -> Result<Vec<(Value, Vec<f64>)>> {
    let parts = partition_by(table, group_column)
        .with_context(|| format!("grouping by {group_column}"))?;

    parts
        .into_iter()
        .map(|(key, part)| {
            let col = part
                .column(metric)
                .with_context(|| format!("column not found: {metric}"))?;
            let mut values = col.present_f64();
            values.sort_by(f64::total_cmp);
            Ok((key, values))
        })
        .collect()
}

fn value_bounds<'a>(series: impl Iterator<Item = &'a f64>) -> Option<(f64, f64)> {
    series.fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

// ---------------------------------------------------------------------------
// Box plot with strip overlay
// ---------------------------------------------------------------------------

/// Box-and-whisker boundaries of one sorted series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_lo: f64,
    pub whisker_hi: f64,
}

impl BoxStats {
    /// Whiskers reach the furthest points within 1.5 IQR of the box.
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        if sorted.is_empty() {
            return None;
        }
        let q1 = quantile_sorted(sorted, 0.25);
        let median = quantile_sorted(sorted, 0.5);
        let q3 = quantile_sorted(sorted, 0.75);
        let reach = 1.5 * (q3 - q1);

        let whisker_lo = sorted
            .iter()
            .copied()
            .find(|&v| v >= q1 - reach)
            .unwrap_or(q1);
        let whisker_hi = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= q3 + reach)
            .unwrap_or(q3);

        Some(BoxStats {
            q1,
            median,
            q3,
            whisker_lo,
            whisker_hi,
        })
    }
}

/// Deterministic horizontal offset in `[-0.5, 0.5)` for the i-th point.
fn jitter(i: usize) -> f64 {
    const GOLDEN: f64 = 0.618_033_988_749_895;
    (i as f64 * GOLDEN).fract() - 0.5
}

/// Orange box per group with every observation drawn as a faint black dot.
pub fn box_and_strip_plot(table: &Table, metric: &str, group_column: &str, path: &Path) -> Result<()> {
    let series = group_series(table, metric, group_column)?;
    let mut canvas = Canvas::new(CHART_WIDTH, CHART_HEIGHT);

    let (lo, hi) = value_bounds(series.iter().flat_map(|(_, v)| v.iter())).unwrap_or((0.0, 1.0));
    let pad = (hi - lo) * 0.05;
    canvas.set_x_range(0.0, series.len().max(1) as f64);
    canvas.set_y_range(lo - pad, hi + pad);

    let half = SLOT_WIDTH / 2.0;
    for (slot, (key, values)) in series.iter().enumerate() {
        let center = slot as f64 + 0.5;
        let Some(b) = BoxStats::from_sorted(values) else {
            warn!("no {metric} values for group {key}, leaving its slot empty");
            continue;
        };

        canvas.fill_rect((center - half, b.q1), (center + half, b.q3), ORANGE);
        let (tl, br) = (canvas.to_px(center - half, b.q3), canvas.to_px(center + half, b.q1));
        canvas.stroke_rect_px(tl, br, BLACK);
        canvas.line((center - half, b.median), (center + half, b.median), BLACK);
        canvas.line((center, b.q3), (center, b.whisker_hi), BLACK);
        canvas.line((center, b.q1), (center, b.whisker_lo), BLACK);
        canvas.line((center - half / 2.0, b.whisker_hi), (center + half / 2.0, b.whisker_hi), BLACK);
        canvas.line((center - half / 2.0, b.whisker_lo), (center + half / 2.0, b.whisker_lo), BLACK);

        for (i, &v) in values.iter().enumerate() {
            let px = canvas.to_px(center + jitter(i) * half / 2.0, v);
            canvas.dot_px(px, 3.0, with_alpha(BLACK, 0.25));
        }
    }

    canvas.draw_axes();
    canvas.save(path)?;
    debug!("{metric} distribution by {group_column} saved to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Kernel density estimate
// ---------------------------------------------------------------------------

/// Scott's rule: sample standard deviation times n^(-1/5).
pub fn scott_bandwidth(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let bw = var.sqrt() * (n as f64).powf(-0.2);
    (bw > 0.0 && bw.is_finite()).then_some(bw)
}

/// Gaussian kernel density of `values` evaluated at each point of `grid`.
pub fn gaussian_kde(values: &[f64], bandwidth: f64, grid: &[f64]) -> Vec<f64> {
    let norm = 1.0 / (values.len() as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    grid.iter()
        .map(|&x| {
            values
                .iter()
                .map(|&v| {
                    let z = (x - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm
        })
        .collect()
}

/// Filled density curve per group, one palette colour each.
pub fn kde_plot(table: &Table, metric: &str, group_column: &str, path: &Path) -> Result<()> {
    let series = group_series(table, metric, group_column)?;
    let colors = ColorMap::new(&series.iter().map(|(k, _)| k.clone()).collect());

    let curves: Vec<(&Value, &Vec<f64>, f64)> = series
        .iter()
        .filter_map(|(key, values)| match scott_bandwidth(values) {
            Some(bw) => Some((key, values, bw)),
            None => {
                warn!("group {key} has too little variance in {metric} for a density estimate");
                None
            }
        })
        .collect();

    let mut canvas = Canvas::new(CHART_WIDTH, CHART_HEIGHT);
    let span = curves.iter().fold(None, |acc: Option<(f64, f64)>, (_, v, bw)| {
        let lo = v[0] - 3.0 * bw;
        let hi = v[v.len() - 1] + 3.0 * bw;
        Some(acc.map_or((lo, hi), |(a, b)| (a.min(lo), b.max(hi))))
    });

    if let Some((lo, hi)) = span {
        let grid: Vec<f64> = (0..KDE_POINTS)
            .map(|i| lo + (hi - lo) * i as f64 / (KDE_POINTS - 1) as f64)
            .collect();
        let densities: Vec<Vec<f64>> = curves
            .iter()
            .map(|(_, values, bw)| gaussian_kde(values, *bw, &grid))
            .collect();
        let peak = densities.iter().flatten().copied().fold(0.0, f64::max);

        canvas.set_x_range(lo, hi);
        canvas.set_y_range(0.0, peak * 1.05);

        for ((key, _, _), density) in curves.iter().zip(&densities) {
            let color = colors.color_for(key);
            let step = (grid[1] - grid[0]) / 2.0;
            for (&x, &d) in grid.iter().zip(density) {
                canvas.fill_rect((x - step, 0.0), (x + step, d), with_alpha(color, 0.25));
            }
            for (xs, ds) in grid.windows(2).zip(density.windows(2)) {
                canvas.line((xs[0], ds[0]), (xs[1], ds[1]), color);
            }
        }
    }

    canvas.draw_axes();
    let legend: Vec<_> = colors.legend_entries().into_iter().map(|(_, c)| c).collect();
    canvas.draw_legend(&legend);
    canvas.save(path)?;
    debug!("{metric} density by {group_column} saved to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Grouped bar chart of a persisted summary
// ---------------------------------------------------------------------------

/// Bars for mean, min, max and median side by side within each group.
pub fn summary_bar_chart(rows: &[SummaryRow], path: &Path) -> Result<()> {
    let stat_colors = generate_palette(4);
    let mut canvas = Canvas::new(CHART_WIDTH, CHART_HEIGHT);

    let stats = |r: &SummaryRow| [r.mean, r.min, r.max, r.median];
    let bounds = rows
        .iter()
        .flat_map(|r| stats(r))
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| {
            Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
        });
    let (lo, hi) = bounds.unwrap_or((0.0, 1.0));
    canvas.set_x_range(0.0, rows.len().max(1) as f64);
    canvas.set_y_range(lo.min(0.0), hi.max(0.0) * 1.05);

    let bar = SLOT_WIDTH / 4.0;
    for (slot, row) in rows.iter().enumerate() {
        let left = slot as f64 + (1.0 - SLOT_WIDTH) / 2.0;
        for (i, (v, color)) in stats(row).into_iter().zip(&stat_colors).enumerate() {
            if !v.is_finite() {
                continue;
            }
            let x0 = left + i as f64 * bar;
            canvas.fill_rect((x0, 0.0), (x0 + bar * 0.9, v), *color);
        }
    }

    canvas.draw_axes();
    canvas.draw_legend(&stat_colors);
    canvas.save(path)
}
