//! Pure derivations over a traffic snapshot.

use crate::model::TrafficRecord;

/// Ranks clients by combined volume, highest first, keeping snapshot order
/// for ties, and truncates to `n`.
pub fn top_talkers(records: &[TrafficRecord], n: usize) -> Vec<TrafficRecord> {
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| b.total().cmp(&a.total()));
    ranked.truncate(n);
    ranked
}

/// Sums per-protocol volume over all records in the snapshot.
///
/// Ordering is first appearance across the snapshot, so the protocol table
/// stays visually stable between refreshes.
pub fn protocol_rollup(records: &[TrafficRecord]) -> Vec<(String, u64)> {
    let mut totals: Vec<(String, u64)> = Vec::new();
    for record in records {
        for (name, count) in &record.protocols {
            match totals.iter_mut().find(|(seen, _)| seen == name) {
                Some((_, total)) => *total = total.saturating_add(*count),
                None => totals.push((name.clone(), *count)),
            }
        }
    }
    totals
}

/// Combined inbound plus outbound volume of the whole snapshot.
pub fn total_volume(records: &[TrafficRecord]) -> u64 {
    records
        .iter()
        .fold(0u64, |acc, record| acc.saturating_add(record.total()))
}

/// Sorts one protocol list by volume, highest first. Ties keep their order.
pub fn rank_protocols(pairs: &[(String, u64)]) -> Vec<(String, u64)> {
    let mut ranked = pairs.to_vec();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Formats a byte count with binary units and at most one decimal place.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let tenths = (value * 10.0).round() as u64;
    if tenths % 10 == 0 {
        format!("{} {}", tenths / 10, UNITS[exp])
    } else {
        format!("{}.{} {}", tenths / 10, tenths % 10, UNITS[exp])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ip: &str, inbound: u64, outbound: u64, protocols: &[(&str, u64)]) -> TrafficRecord {
        TrafficRecord {
            client_ip: ip.to_string(),
            inbound,
            outbound,
            protocols: protocols
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
            created_at: None,
        }
    }

    #[test]
    fn format_bytes_table() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1), "1 B");
        assert_eq!(format_bytes(150), "150 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1 MB");
        assert_eq!(format_bytes(1073741824), "1 GB");
        assert_eq!(format_bytes(1099511627776), "1 TB");
    }

    #[test]
    fn format_bytes_clamps_to_largest_unit() {
        assert!(format_bytes(u64::MAX).ends_with(" TB"));
    }

    #[test]
    fn top_talkers_ranks_by_combined_volume() {
        let records = vec![
            record("10.0.0.1", 10, 10, &[]),
            record("10.0.0.2", 500, 100, &[]),
            record("10.0.0.3", 0, 300, &[]),
        ];
        let top = top_talkers(&records, 10);
        let ips: Vec<&str> = top.iter().map(|r| r.client_ip.as_str()).collect();
        assert_eq!(ips, vec!["10.0.0.2", "10.0.0.3", "10.0.0.1"]);
    }

    #[test]
    fn top_talkers_truncates_and_handles_short_input() {
        let records: Vec<TrafficRecord> = (0..15)
            .map(|i| record(&format!("10.0.0.{i}"), i as u64, 0, &[]))
            .collect();
        assert_eq!(top_talkers(&records, 10).len(), 10);
        assert_eq!(top_talkers(&records[..3], 10).len(), 3);
        assert!(top_talkers(&[], 10).is_empty());
    }

    #[test]
    fn top_talkers_keeps_snapshot_order_for_ties() {
        let records = vec![
            record("first", 50, 50, &[]),
            record("second", 100, 0, &[]),
            record("third", 0, 100, &[]),
        ];
        let top = top_talkers(&records, 3);
        let ips: Vec<&str> = top.iter().map(|r| r.client_ip.as_str()).collect();
        assert_eq!(ips, vec!["first", "second", "third"]);
    }

    #[test]
    fn rollup_covers_every_record_in_first_appearance_order() {
        let records = vec![
            record("a", 0, 0, &[("TCP:443", 100), ("UDP:53", 10)]),
            record("b", 0, 0, &[("ICMP", 5), ("TCP:443", 50)]),
            record("c", 0, 0, &[("UDP:53", 30)]),
        ];
        assert_eq!(
            protocol_rollup(&records),
            vec![
                ("TCP:443".to_string(), 150),
                ("UDP:53".to_string(), 40),
                ("ICMP".to_string(), 5)
            ]
        );
    }

    #[test]
    fn rank_protocols_sorts_by_volume() {
        let pairs = vec![
            ("UDP:53".to_string(), 20),
            ("TCP:80".to_string(), 80),
            ("ARP".to_string(), 20),
        ];
        let ranked = rank_protocols(&pairs);
        assert_eq!(ranked[0].0, "TCP:80");
        // tied entries keep their relative order
        assert_eq!(ranked[1].0, "UDP:53");
        assert_eq!(ranked[2].0, "ARP");
    }

    #[test]
    fn single_client_scenario() {
        let records = vec![record(
            "192.168.0.1",
            100,
            50,
            &[("TCP", 80), ("UDP", 20)],
        )];
        let top = top_talkers(&records, 10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].total(), 150);
        assert_eq!(format_bytes(total_volume(&records)), "150 B");
        assert_eq!(
            protocol_rollup(&records),
            vec![("TCP".to_string(), 80), ("UDP".to_string(), 20)]
        );
    }
}
