//! Kubernetes quantity string parsing and formatting.
//!
//! Parsing is deliberately lenient: upstream data is not always well-formed
//! (metrics-server, kubelet and pod specs disagree on units), and the
//! dashboard must still render. Anything unparsable comes back as 0; callers
//! that need to distinguish "unset" from "0" keep the raw string around.

const GIB: i64 = 1024 * 1024 * 1024;
const MIB: i64 = 1024 * 1024;
const KIB: i64 = 1024;

/// Converts a k8s CPU quantity to millicores.
/// Handles nanocores ("18447n", as returned by metrics-server), millicores
/// ("500m"), and whole cores ("2", "0.5").
pub fn parse_cpu(raw: &str) -> i64 {
    if let Some(stripped) = raw.strip_suffix('n') {
        return stripped.parse::<i64>().unwrap_or(0) / 1_000_000;
    }
    if let Some(stripped) = raw.strip_suffix('m') {
        return stripped.parse::<i64>().unwrap_or(0);
    }
    (raw.parse::<f64>().unwrap_or(0.0) * 1000.0) as i64
}

/// Converts a k8s memory/storage quantity to bytes.
/// Supports binary (Ki/Mi/Gi/Ti) and decimal (K/M/G/T) suffixes; binary
/// suffixes are matched first so "Ki" never parses as "K". A trailing "n"
/// (nanobytes, seen in some summary payloads) divides down to bytes.
pub fn parse_memory(raw: &str) -> i64 {
    const SUFFIXES: [(&str, i64); 8] = [
        ("Ki", KIB),
        ("Mi", MIB),
        ("Gi", GIB),
        ("Ti", 1024 * GIB),
        ("K", 1000),
        ("M", 1000 * 1000),
        ("G", 1000 * 1000 * 1000),
        ("T", 1000 * 1000 * 1000 * 1000),
    ];
    for (suffix, factor) in SUFFIXES {
        if let Some(stripped) = raw.strip_suffix(suffix) {
            return stripped.parse::<i64>().unwrap_or(0).saturating_mul(factor);
        }
    }
    if let Some(stripped) = raw.strip_suffix('n') {
        return stripped.parse::<i64>().unwrap_or(0) / 1_000_000_000;
    }
    raw.parse::<i64>().unwrap_or(0)
}

/// Parses the node `pods` capacity field. That field is a plain integer pod
/// count, not a byte quantity, so it gets its own parse instead of going
/// through [`parse_memory`].
pub fn parse_pod_count(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}

/// Formats a byte count as a human-readable string (Gi/Mi/Ki/B).
pub fn format_bytes(bytes: i64) -> String {
    if bytes >= GIB {
        format!("{:.2} Gi", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{} Mi", bytes / MIB)
    } else if bytes >= KIB {
        format!("{} Ki", bytes / KIB)
    } else {
        format!("{} B", bytes)
    }
}

/// Formats millicores as "500m" below one core, else cores with 2 decimals.
pub fn format_millicores(millicores: i64) -> String {
    if millicores >= 1000 {
        format!("{:.2}", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cpu_quantities() {
        assert_eq!(parse_cpu("500m"), 500);
        assert_eq!(parse_cpu("2"), 2000);
        assert_eq!(parse_cpu("0.5"), 500);
        // nanocores truncate, never round
        assert_eq!(parse_cpu("18447n"), 0);
        assert_eq!(parse_cpu("1000000n"), 1);
        assert_eq!(parse_cpu("1500000000n"), 1500);
        assert_eq!(parse_cpu(""), 0);
        assert_eq!(parse_cpu("garbage"), 0);
    }

    #[test]
    fn parses_memory_quantities() {
        assert_eq!(parse_memory("128Mi"), 134_217_728);
        assert_eq!(parse_memory("1Gi"), 1_073_741_824);
        assert_eq!(parse_memory("500Ki"), 512_000);
        assert_eq!(parse_memory("1000M"), 1_000_000_000);
        assert_eq!(parse_memory("2G"), 2_000_000_000);
        assert_eq!(parse_memory("1Ti"), 1_099_511_627_776);
        assert_eq!(parse_memory("1048576"), 1_048_576);
        assert_eq!(parse_memory("2000000000n"), 2);
        assert_eq!(parse_memory(""), 0);
        assert_eq!(parse_memory("not-a-quantity"), 0);
    }

    #[test]
    fn binary_suffix_wins_over_decimal() {
        // "Ki" must never be read as "K" with a trailing 'i'
        assert_eq!(parse_memory("1Ki"), 1024);
        assert_eq!(parse_memory("1K"), 1000);
    }

    #[test]
    fn parses_pod_count_as_plain_integer() {
        assert_eq!(parse_pod_count("110"), 110);
        assert_eq!(parse_pod_count(" 250 "), 250);
        assert_eq!(parse_pod_count(""), 0);
        // a unit suffix here is upstream garbage, not a quantity
        assert_eq!(parse_pod_count("110Ki"), 0);
    }

    #[test]
    fn formats_bytes_with_largest_unit() {
        assert_eq!(format_bytes(2 * 1024 * 1024 * 1024), "2.00 Gi");
        assert_eq!(format_bytes(1_610_612_736), "1.50 Gi");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 Mi");
        assert_eq!(format_bytes(3 * 1024), "3 Ki");
        assert_eq!(format_bytes(512), "512 B");
    }

    #[test]
    fn formats_millicores() {
        assert_eq!(format_millicores(500), "500m");
        assert_eq!(format_millicores(1000), "1.00");
        assert_eq!(format_millicores(1500), "1.50");
        assert_eq!(format_millicores(0), "0m");
    }
}
