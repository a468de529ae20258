//! X12 850 purchase-order generation. One document per PO. Output for a
//! given (PO, revision, timestamp) is byte-identical modulo the interchange
//! control number.

use chrono::{DateTime, Utc};

const SEGMENT_TERMINATOR: char = '~';
const X12_VERSION: &str = "004010";

#[derive(Clone, Debug)]
pub struct Po850Line {
    pub vendor_sku: String,
    pub qty: i32,
    /// unit cost in dollars, already two-decimal
    pub unit_cost: String,
    pub description: String,
}

#[derive(Clone, Debug)]
pub struct Po850 {
    pub po_number: String,
    pub revision: i32,
    pub sender_id: String,
    pub receiver_id: String,
    pub lines: Vec<Po850Line>,
}

fn pad15(value: &str) -> String {
    format!("{value:<15.15}")
}

/// Renders the full interchange (ISA…IEA) for one purchase order.
pub fn generate_850(po: &Po850, interchange_control_number: i64, timestamp: DateTime<Utc>) -> String {
    let date_short = timestamp.format("%y%m%d");
    let date_long = timestamp.format("%Y%m%d");
    let time = timestamp.format("%H%M");
    let icn = format!("{interchange_control_number:09}");

    let mut segments: Vec<String> = Vec::new();
    segments.push(format!(
        "ISA*00*          *00*          *ZZ*{}*ZZ*{}*{}*{}*U*00401*{}*0*P*>",
        pad15(&po.sender_id),
        pad15(&po.receiver_id),
        date_short,
        time,
        icn
    ));
    segments.push(format!(
        "GS*PO*{}*{}*{}*{}*{}*X*{}",
        po.sender_id, po.receiver_id, date_long, time, interchange_control_number, X12_VERSION
    ));

    let mut transaction: Vec<String> = Vec::new();
    transaction.push("ST*850*0001".to_string());
    transaction.push(format!(
        "BEG*00*SA*{}*{}*{}",
        po.po_number, po.revision, date_long
    ));
    for (index, line) in po.lines.iter().enumerate() {
        transaction.push(format!(
            "PO1*{}*{}*EA*{}**VP*{}",
            index + 1,
            line.qty,
            line.unit_cost,
            line.vendor_sku
        ));
        transaction.push(format!("PID*F****{}", line.description));
    }
    transaction.push(format!("CTT*{}", po.lines.len()));
    // SE counts itself and ST
    transaction.push(format!("SE*{}*0001", transaction.len() + 1));

    segments.extend(transaction);
    segments.push(format!("GE*1*{interchange_control_number}"));
    segments.push(format!("IEA*1*{icn}"));

    let mut out = String::new();
    for segment in segments {
        out.push_str(&segment);
        out.push(SEGMENT_TERMINATOR);
        out.push('\n');
    }
    out
}

/// File name the vendor sees in its inbox.
pub fn file_name_850(po_number: &str, interchange_control_number: i64) -> String {
    format!("{po_number}_{interchange_control_number:09}.850")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_po() -> Po850 {
        Po850 {
            po_number: "PO-ACME-20260801-0001".to_string(),
            revision: 1,
            sender_id: "FLOORLINE".to_string(),
            receiver_id: "ACME".to_string(),
            lines: vec![
                Po850Line {
                    vendor_sku: "ACM-OAK-7".to_string(),
                    qty: 10,
                    unit_cost: "42.50".to_string(),
                    description: "White Oak 7in".to_string(),
                },
                Po850Line {
                    vendor_sku: "ACM-MAPLE-5".to_string(),
                    qty: 4,
                    unit_cost: "38.00".to_string(),
                    description: "Maple 5in".to_string(),
                },
            ],
        }
    }

    #[test]
    fn same_inputs_same_bytes_modulo_icn() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let a = generate_850(&sample_po(), 100, ts);
        let b = generate_850(&sample_po(), 200, ts);
        let strip = |doc: &str| {
            doc.replace("000000100", "ICN")
                .replace("000000200", "ICN")
                .replace("*100*", "*ICN*")
                .replace("*200*", "*ICN*")
                .replace("*100~", "*ICN~")
                .replace("*200~", "*ICN~")
        };
        assert_eq!(strip(&a), strip(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn envelope_structure_is_complete() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let doc = generate_850(&sample_po(), 42, ts);
        for prefix in ["ISA*", "GS*PO*", "ST*850*", "BEG*00*SA*", "PO1*1*10*EA*42.50", "CTT*2", "SE*", "GE*1*42", "IEA*1*000000042"] {
            assert!(doc.contains(prefix), "missing segment {prefix} in:\n{doc}");
        }
    }

    #[test]
    fn se_count_matches_transaction_segments() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let doc = generate_850(&sample_po(), 42, ts);
        // ST + BEG + 2×(PO1+PID) + CTT + SE = 8
        assert!(doc.contains("SE*8*0001"));
    }

    #[test]
    fn isa_ids_are_fixed_width() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let doc = generate_850(&sample_po(), 1, ts);
        assert!(doc.contains("ZZ*FLOORLINE      *ZZ*ACME           *"));
    }
}
