use floorline_core::{Error, ErrorKind};
use rust_decimal::Decimal;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Commerce module errors.
#[derive(Debug, ThisError)]
pub enum CommerceError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Event error: {0}")]
    Event(#[from] floorline_core::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Order item not found: {0}")]
    OrderItemNotFound(Uuid),

    #[error("Purchase order not found: {0}")]
    PurchaseOrderNotFound(Uuid),

    #[error("Quote not found: {0}")]
    QuoteNotFound(Uuid),

    #[error("SKU not found: {0}")]
    SkuNotFound(String),

    #[error("Payment request not found: {0}")]
    PaymentRequestNotFound(Uuid),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Tracking number is required to mark a shipping order as shipped")]
    TrackingNumberRequired,

    #[error("Order has a refund on record and cannot be un-cancelled")]
    RefundedOrderUncancel,

    #[error("Order status can only become refunded through the refund endpoint")]
    RefundViaEndpointOnly,

    #[error("Nothing refundable: {max_refundable} remaining")]
    NothingRefundable { max_refundable: Decimal },

    #[error("Refund of {requested} exceeds refundable amount {max_refundable}")]
    RefundExceedsMax {
        requested: Decimal,
        max_refundable: Decimal,
    },

    #[error("Order has no gateway payment reference to refund against")]
    NoGatewayReference,

    #[error("Additional charges must be reversed through their checkout session")]
    AdditionalChargeNotRefundable,

    #[error("Promo code error: {0}")]
    Promo(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Quote already converted")]
    QuoteAlreadyConverted,

    #[error("Only draft purchase orders can be edited")]
    PurchaseOrderNotEditable,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type CommerceResult<T> = Result<T, CommerceError>;

impl From<CommerceError> for Error {
    fn from(err: CommerceError) -> Self {
        match err {
            CommerceError::Database(e) => Error::Database(e),
            CommerceError::Event(e) => e,
            CommerceError::OrderNotFound(_)
            | CommerceError::OrderItemNotFound(_)
            | CommerceError::PurchaseOrderNotFound(_)
            | CommerceError::QuoteNotFound(_)
            | CommerceError::SkuNotFound(_)
            | CommerceError::PaymentRequestNotFound(_) => Error::NotFound(err.to_string()),
            CommerceError::Conflict(_) | CommerceError::QuoteAlreadyConverted => {
                Error::Conflict(err.to_string())
            }
            CommerceError::Gateway(_) => Error::External(err.to_string()),
            _ => Error::Validation(err.to_string()),
        }
    }
}

impl CommerceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Database(_) => ErrorKind::Database,
            Self::Event(e) => e.kind(),
            Self::OrderNotFound(_)
            | Self::OrderItemNotFound(_)
            | Self::PurchaseOrderNotFound(_)
            | Self::QuoteNotFound(_)
            | Self::SkuNotFound(_)
            | Self::PaymentRequestNotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) | Self::QuoteAlreadyConverted => ErrorKind::Conflict,
            Self::Gateway(_) => ErrorKind::ExternalService,
            _ => ErrorKind::Validation,
        }
    }
}
