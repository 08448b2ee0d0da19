//! Human-readable formatting and Kubernetes quantity parsing

/// Unit labels, indexed by the number of 1024 divisions
const BYTE_UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

/// Format a byte count as a human-readable string.
///
/// The value is divided by 1024 while it is strictly greater than 1024, so
/// exactly 1024 bytes stays `"1024 B"`. Plain bytes print as an integer,
/// larger units with one decimal place.
pub fn format_bytes(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;

    while size > 1024.0 && unit < BYTE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, BYTE_UNITS[0])
    } else {
        format!("{:.1} {}", size, BYTE_UNITS[unit])
    }
}

/// Parse a CPU quantity ("250m", "2", "1.5") into cores
pub fn parse_cpu(quantity: &str) -> Option<f64> {
    let quantity = quantity.trim();
    if let Some(millis) = quantity.strip_suffix('m') {
        return millis.parse::<f64>().ok().map(|m| m / 1000.0);
    }
    if let Some(micros) = quantity.strip_suffix('u') {
        return micros.parse::<f64>().ok().map(|u| u / 1_000_000.0);
    }
    if let Some(nanos) = quantity.strip_suffix('n') {
        return nanos.parse::<f64>().ok().map(|n| n / 1_000_000_000.0);
    }
    quantity.parse::<f64>().ok()
}

/// Binary (Ki, Mi, ...) and decimal (k, M, ...) memory suffixes with their multipliers.
/// Two-letter suffixes come first so "Mi" is not read as "M".
const MEMORY_SUFFIXES: [(&str, f64); 12] = [
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Parse a memory quantity ("128Mi", "4096Ki", "1G", "1048576") into bytes
pub fn parse_memory(quantity: &str) -> Option<u64> {
    let quantity = quantity.trim();

    for (suffix, multiplier) in MEMORY_SUFFIXES {
        if let Some(number) = quantity.strip_suffix(suffix) {
            let value = number.parse::<f64>().ok()?;
            return (value >= 0.0).then(|| (value * multiplier).round() as u64);
        }
    }

    quantity
        .parse::<u64>()
        .ok()
        .or_else(|| quantity.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v.round() as u64))
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `used` over `total`, rounded to two decimals; 0 when `total` is not positive
pub fn percent(used: f64, total: f64) -> f64 {
    if total > 0.0 {
        round2(used / total * 100.0)
    } else {
        0.0
    }
}
