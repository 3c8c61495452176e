//! Deterministic text exposition of a pool snapshot.
//!
//! One line per metric, `pool.counter.dimension = value`, counters in slot
//! order. Percentages use integer division. The format is shaped for
//! line-oriented scrapers: every value is an integer, and the set of lines
//! for a counter depends only on the pool layout (plus the conditional
//! `.percent` lines, which appear once the relevant total is non-zero).

use std::fmt::Write as _;

use crate::config::LatencyBucket;
use crate::counter::STATUS_GROUPS;
use crate::pool::{CounterSnapshot, PoolSnapshot};

/// Renders every counter of `snapshot` into `out`.
pub(crate) fn render_pool(snapshot: &PoolSnapshot, out: &mut String) {
    for counter in &snapshot.counters {
        render_counter(snapshot, counter, out);
    }
}

fn render_counter(pool: &PoolSnapshot, counter: &CounterSnapshot, out: &mut String) {
    let prefix = format!("{}.{}", pool.name, counter.name);

    let tracked_total = *counter.status_counts.last().unwrap_or(&0);
    let group_total = counter.status_group_counts[STATUS_GROUPS - 1];
    let latency_total = *counter.latency_agg_counts.last().unwrap_or(&0);

    // Tracked status codes.
    let _ = writeln!(out, "{prefix}.http = {tracked_total}");
    if group_total > 0 {
        let _ = writeln!(out, "{prefix}.http.percent = {}", tracked_total * 100 / group_total);
    }
    for (i, &code) in pool.status_codes.iter().enumerate() {
        let hits = counter.status_counts[i];
        let _ = writeln!(out, "{prefix}.http_{code} = {hits}");
        if tracked_total > 0 {
            let _ = writeln!(out, "{prefix}.http_{code}.percent = {}", hits * 100 / tracked_total);
        }
    }

    // Status groups.
    let _ = writeln!(out, "{prefix}.http_xxx = {group_total}");
    let _ = writeln!(out, "{prefix}.http_xxx.percent = 100");
    for group in 0..STATUS_GROUPS - 1 {
        let hits = counter.status_group_counts[group];
        let _ = writeln!(out, "{prefix}.http_{}xx = {hits}", group + 1);
        if group_total > 0 {
            let _ =
                writeln!(out, "{prefix}.http_{}xx.percent = {}", group + 1, hits * 100 / group_total);
        }
    }

    // Averages.
    let _ = writeln!(out, "{prefix}.avg = {}", counter.mean.round() as i64);
    let _ = writeln!(out, "{prefix}.avg.mov = {}", counter.moving_avg.round() as i64);

    // Latency buckets.
    let buckets = pool
        .latency_edges
        .iter()
        .map(|&edge| LatencyBucket::UpTo(edge))
        .chain(std::iter::once(LatencyBucket::Inf));
    for (i, bucket) in buckets.enumerate() {
        let exact = counter.latency_counts[i];
        let label = match bucket {
            LatencyBucket::UpTo(edge) => edge.to_string(),
            LatencyBucket::Inf => "inf".to_owned(),
        };
        let _ = writeln!(out, "{prefix}.{label} = {exact}");
        if latency_total > 0 {
            let _ = writeln!(out, "{prefix}.{label}.percent = {}", exact * 100 / latency_total);
        }
        match bucket {
            LatencyBucket::UpTo(_) => {
                let agg = counter.latency_agg_counts[i];
                let _ = writeln!(out, "{prefix}.{label}.agg = {agg}");
                if latency_total > 0 {
                    let _ = writeln!(
                        out,
                        "{prefix}.{label}.agg.percent = {}",
                        agg * 100 / latency_total
                    );
                }
            }
            // The overflow bucket's cumulative count is the total by
            // construction; its share is always whole.
            LatencyBucket::Inf => {
                let _ = writeln!(out, "{prefix}.{label}.agg = {latency_total}");
                let _ = writeln!(out, "{prefix}.{label}.agg.percent = 100");
            }
        }
    }

    // Quantiles.
    for (i, &target) in pool.quantile_targets.iter().enumerate() {
        let _ = writeln!(out, "{prefix}.p{target} = {}", counter.quantiles[i].round() as i64);
    }
}
