//! Status and kind enums stored as plain strings. Columns stay `String` so
//! SQLite tests and Postgres share one schema; these enums are the only
//! place the string constants live.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CommerceError;

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            pub fn parse(value: &str) -> Result<Self, CommerceError> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    other => Err(CommerceError::Validation(format!(
                        concat!("invalid ", stringify!($name), ": {}"),
                        other
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(OrderStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl OrderStatus {
    /// Position in the forward progression; cancel/refund sit outside it.
    pub fn stage(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled | Self::Refunded => None,
        }
    }
}

string_enum!(DeliveryMethod {
    Pickup => "pickup",
    Shipping => "shipping",
});

string_enum!(SellBy {
    Sqft => "sqft",
    Unit => "unit",
});

string_enum!(PriceTier {
    Cut => "cut",
    Roll => "roll",
});

string_enum!(PriceBasis {
    PerSqft => "per_sqft",
    PerBox => "per_box",
});

string_enum!(PoStatus {
    Draft => "draft",
    Sent => "sent",
    Acknowledged => "acknowledged",
    Fulfilled => "fulfilled",
    Cancelled => "cancelled",
});

string_enum!(PoItemStatus {
    Pending => "pending",
    Ordered => "ordered",
    Shipped => "shipped",
    Received => "received",
    Cancelled => "cancelled",
});

string_enum!(PaymentType {
    Charge => "charge",
    AdditionalCharge => "additional_charge",
    Refund => "refund",
});

string_enum!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

string_enum!(PaymentRequestStatus {
    Pending => "pending",
    Paid => "paid",
    Expired => "expired",
    Cancelled => "cancelled",
});

string_enum!(QuoteStatus {
    Draft => "draft",
    Sent => "sent",
    Converted => "converted",
    Expired => "expired",
});

string_enum!(CommissionStatus {
    Pending => "pending",
    Earned => "earned",
    Paid => "paid",
    Forfeited => "forfeited",
});

string_enum!(PromoType {
    Percent => "percent",
    Fixed => "fixed",
});

string_enum!(OrderSource {
    Retail => "retail",
    Trade => "trade",
    Rep => "rep",
    Quote => "quote",
});

/// Derived from the ledger aggregate, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    Paid,
    Credit,
    BalanceDue,
}

impl BalanceStatus {
    const EPSILON_CENTS: i64 = 1;

    pub fn derive(total: Decimal, amount_paid: Decimal) -> Self {
        let delta = amount_paid - total;
        let epsilon = Decimal::new(Self::EPSILON_CENTS, 2);
        if delta.abs() <= epsilon {
            Self::Paid
        } else if delta > epsilon {
            Self::Credit
        } else {
            Self::BalanceDue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn balance_status_one_cent_tolerance() {
        assert_eq!(
            BalanceStatus::derive(dec!(100.00), dec!(100.01)),
            BalanceStatus::Paid
        );
        assert_eq!(
            BalanceStatus::derive(dec!(100.00), dec!(100.02)),
            BalanceStatus::Credit
        );
        assert_eq!(
            BalanceStatus::derive(dec!(100.00), dec!(99.98)),
            BalanceStatus::BalanceDue
        );
    }

    #[test]
    fn order_status_round_trips() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(OrderStatus::parse("unknown").is_err());
    }
}
