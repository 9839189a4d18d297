use crate::models::WeightRecord;

/// Trailing simple moving average. Element `i` averages the last `window`
/// values up to and including `values[i]`; the first few use what exists.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        let len = (i + 1).min(window);
        out.push(sum / len as f64);
    }
    out
}

/// Latest weight and its moving average, oldest-first input not required.
pub fn weight_trend(records: &[WeightRecord], window: usize) -> Option<(f64, f64)> {
    let mut sorted: Vec<&WeightRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.recorded_at);
    let values: Vec<f64> = sorted.iter().map(|r| r.weight_value).collect();

    let latest = *values.last()?;
    let average = *moving_average(&values, window).last()?;
    Some((latest, average))
}
