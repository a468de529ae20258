//! Parcel/LTL selection, class splitting, and the explicit fallback.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use floorline_shipping::ltl::{LtlRater, LtlRequest};
use floorline_shipping::parcel::ParcelRater;
use floorline_shipping::{
    RateOption, ShipmentLine, ShipmentMethod, ShippingError, ShippingResult, ShippingService,
};
use floorline_test_utils::setup_test_db;

fn option(carrier: &str, cost: Decimal, days: i32) -> RateOption {
    RateOption {
        carrier: carrier.to_string(),
        service: "Standard".to_string(),
        cost,
        transit_days: Some(days),
        is_cheapest: false,
        is_fallback: false,
    }
}

struct StubParcel {
    quotes: Vec<RateOption>,
    calls: Mutex<Vec<(String, String, Decimal)>>,
}

#[async_trait]
impl ParcelRater for StubParcel {
    async fn quote(
        &self,
        origin_zip: &str,
        dest_zip: &str,
        weight_lbs: Decimal,
    ) -> ShippingResult<Vec<RateOption>> {
        self.calls
            .lock()
            .unwrap()
            .push((origin_zip.to_string(), dest_zip.to_string(), weight_lbs));
        Ok(self.quotes.clone())
    }
}

enum LtlBehavior {
    Quotes(Vec<RateOption>),
    Fail,
}

struct StubLtl {
    behavior: LtlBehavior,
    requests: Mutex<Vec<LtlRequest>>,
}

#[async_trait]
impl LtlRater for StubLtl {
    async fn quote(&self, request: &LtlRequest) -> ShippingResult<Vec<RateOption>> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.behavior {
            LtlBehavior::Quotes(quotes) => Ok(quotes.clone()),
            LtlBehavior::Fail => Err(ShippingError::LtlRater("503 from rater".into())),
        }
    }
}

async fn service_with(
    parcel: Arc<StubParcel>,
    ltl: Arc<StubLtl>,
) -> ShippingService {
    let db = setup_test_db().await;
    ShippingService::new(db, parcel, ltl)
}

fn line(boxes: i32, weight: Decimal, class: Option<&str>) -> ShipmentLine {
    ShipmentLine {
        num_boxes: boxes,
        weight_per_box: weight,
        freight_class: class.map(str::to_string),
        is_sample: false,
    }
}

fn parcel_stub(quotes: Vec<RateOption>) -> Arc<StubParcel> {
    Arc::new(StubParcel {
        quotes,
        calls: Mutex::new(Vec::new()),
    })
}

fn ltl_stub(behavior: LtlBehavior) -> Arc<StubLtl> {
    Arc::new(StubLtl {
        behavior,
        requests: Mutex::new(Vec::new()),
    })
}

#[tokio::test]
async fn at_exactly_150_lbs_parcel_wins_and_cheapest_is_picked() {
    let parcel = parcel_stub(vec![
        option("UPS", dec!(31.40), 4),
        option("FedEx", dec!(28.75), 5),
    ]);
    let ltl = ltl_stub(LtlBehavior::Fail);
    let service = service_with(parcel.clone(), ltl.clone()).await;

    let quote = service
        .rate(&[line(3, dec!(50), None)], "77002", true, true)
        .await
        .unwrap();
    assert_eq!(quote.method, ShipmentMethod::Parcel);
    assert_eq!(quote.options.len(), 1);
    assert_eq!(quote.options[0].carrier, "FedEx");
    assert!(quote.options[0].is_cheapest);
    assert!(!quote.is_fallback);

    let calls = parcel.calls.lock().unwrap();
    assert_eq!(calls[0].0, "92806");
    assert_eq!(calls[0].2, dec!(150));
    // LTL never consulted
    assert!(ltl.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn over_150_lbs_splits_by_freight_class_and_returns_top_three() {
    let ltl = ltl_stub(LtlBehavior::Quotes(vec![
        option("Estes", dec!(310.00), 4),
        option("XPO", dec!(295.00), 5),
        option("ODFL", dec!(340.00), 3),
        option("Saia", dec!(400.00), 3),
    ]));
    let parcel = parcel_stub(vec![]);
    let service = service_with(parcel, ltl.clone()).await;

    // 10×50 lb @ class 70 and 5×80 lb @ class 125
    let quote = service
        .rate(
            &[line(10, dec!(50), Some("70")), line(5, dec!(80), Some("125"))],
            "77002",
            true,
            true,
        )
        .await
        .unwrap();

    assert_eq!(quote.method, ShipmentMethod::Ltl);
    assert_eq!(quote.options.len(), 3);
    assert_eq!(quote.options[0].carrier, "XPO");
    assert!(quote.options[0].is_cheapest);
    assert!(!quote.options[1].is_cheapest);
    assert!(!quote.is_fallback);

    let requests = ltl.requests.lock().unwrap();
    let request = &requests[0];
    assert_eq!(request.lines.len(), 2);
    let weights: Vec<(String, i64)> = request
        .lines
        .iter()
        .map(|l| (l.freight_class.clone(), l.weight_lbs))
        .collect();
    assert!(weights.contains(&("70".to_string(), 500)));
    assert!(weights.contains(&("125".to_string(), 400)));
    assert!(request.residential);
    assert!(request.liftgate);
}

#[tokio::test]
async fn ltl_failure_answers_from_the_zone_table_flagged_as_fallback() {
    let service = service_with(parcel_stub(vec![]), ltl_stub(LtlBehavior::Fail)).await;

    let quote = service
        .rate(&[line(18, dec!(50), Some("70"))], "77002", true, true)
        .await
        .unwrap();

    assert!(quote.is_fallback);
    assert_eq!(quote.options.len(), 3);
    assert!(quote.options.iter().all(|o| o.is_fallback));
    assert!(quote.options[0].is_cheapest);
    // economy < standard < expedited
    assert!(quote.options[0].cost < quote.options[1].cost);
    assert!(quote.options[1].cost < quote.options[2].cost);
    // 900 lb × $0.50 × 1.30 (7xxxx zone) = $585.00
    assert_eq!(quote.options[0].cost, dec!(585.00));
}

#[tokio::test]
async fn sample_only_orders_ship_free() {
    let service = service_with(parcel_stub(vec![]), ltl_stub(LtlBehavior::Fail)).await;
    let mut sample = line(3, dec!(1), None);
    sample.is_sample = true;

    let quote = service.rate(&[sample], "30301", true, true).await.unwrap();
    assert_eq!(quote.method, ShipmentMethod::None);
    assert_eq!(quote.options[0].cost, Decimal::ZERO);
    assert!(!quote.is_fallback);
}

#[tokio::test]
async fn bad_zip_is_a_validation_error() {
    let service = service_with(parcel_stub(vec![]), ltl_stub(LtlBehavior::Fail)).await;
    let err = service
        .rate(&[line(1, dec!(10), None)], "ABC12", true, true)
        .await
        .unwrap_err();
    assert!(matches!(err, ShippingError::Validation(_)));
}
