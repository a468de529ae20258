//! Minimal 855 (PO acknowledgment) reading: enough to match the inbound
//! document to the interchange we sent and advance the PO. Everything else
//! in the document is ignored.

use crate::error::{EdiError, EdiResult};

#[derive(Clone, Debug, PartialEq)]
pub struct Ack855 {
    pub interchange_control_number: i64,
    pub po_number: Option<String>,
    /// BAK01 "00"/"AC" family means accepted; "RJ" rejected
    pub accepted: bool,
}

pub fn parse_855(document: &str) -> EdiResult<Ack855> {
    let mut interchange = None;
    let mut po_number = None;
    let mut accepted = true;
    let mut is_855 = false;

    for segment in document.split('~') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let elements: Vec<&str> = segment.split('*').collect();
        match elements[0] {
            "ISA" => {
                let raw = elements
                    .get(13)
                    .ok_or_else(|| EdiError::Malformed("ISA segment too short".into()))?;
                interchange = Some(raw.trim().parse::<i64>().map_err(|_| {
                    EdiError::Malformed(format!("bad interchange control number {raw}"))
                })?);
            }
            "ST" => {
                is_855 = elements.get(1) == Some(&"855");
            }
            "BAK" => {
                accepted = !matches!(elements.get(1), Some(&"RJ"));
                po_number = elements.get(3).map(|s| s.to_string());
            }
            _ => {}
        }
    }

    if !is_855 {
        return Err(EdiError::Malformed("not an 855 document".into()));
    }
    let interchange_control_number =
        interchange.ok_or_else(|| EdiError::Malformed("missing ISA envelope".into()))?;
    Ok(Ack855 {
        interchange_control_number,
        po_number,
        accepted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "ISA*00*          *00*          *ZZ*ACME           *ZZ*FLOORLINE      *260801*1200*U*00401*000000042*0*P*>~\nGS*PR*ACME*FLOORLINE*20260801*1200*42*X*004010~\nST*855*0001~\nBAK*00*AD*PO-ACME-20260801-0001*20260801~\nSE*3*0001~\nGE*1*42~\nIEA*1*000000042~";

    #[test]
    fn parses_interchange_and_po_number() {
        let ack = parse_855(SAMPLE).unwrap();
        assert_eq!(ack.interchange_control_number, 42);
        assert_eq!(ack.po_number.as_deref(), Some("PO-ACME-20260801-0001"));
        assert!(ack.accepted);
    }

    #[test]
    fn rejected_bak_is_flagged() {
        let doc = SAMPLE.replace("BAK*00*", "BAK*RJ*");
        let ack = parse_855(&doc).unwrap();
        assert!(!ack.accepted);
    }

    #[test]
    fn non_855_is_an_error() {
        let doc = SAMPLE.replace("ST*855*", "ST*856*");
        assert!(parse_855(&doc).is_err());
    }
}
