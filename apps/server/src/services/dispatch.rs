use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use floorline_commerce::entities::{purchase_order, purchase_order_item, vendor};
use floorline_commerce::services::{EdiDispatchReceipt, PoDispatch};
use floorline_commerce::{CommerceError, CommerceResult};
use floorline_edi::{
    file_name_850, generate_850, EdiTransport, InterchangeCounter, Po850, Po850Line, SftpConfig,
    SftpTransport,
};
use floorline_email::EmailService;

const SENDER_ID: &str = "FLOORLINE";

/// PDF rendering is an external collaborator (headless browser). When it is
/// unavailable the email carries the raw HTML body instead.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Option<Vec<u8>>;
}

/// The always-available fallback renderer.
pub struct RawHtmlRenderer;

#[async_trait]
impl PdfRenderer for RawHtmlRenderer {
    async fn render(&self, _html: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Physical PO dispatch: X12 850 over SFTP, or a rendered email.
pub struct PoDispatcher {
    email: EmailService,
    counter: Arc<InterchangeCounter>,
    pdf: Arc<dyn PdfRenderer>,
}

impl PoDispatcher {
    pub fn new(
        email: EmailService,
        counter: Arc<InterchangeCounter>,
        pdf: Arc<dyn PdfRenderer>,
    ) -> Self {
        Self {
            email,
            counter,
            pdf,
        }
    }

    fn sftp_config(vendor: &vendor::Model) -> CommerceResult<SftpConfig> {
        let config = vendor
            .edi_config
            .as_ref()
            .and_then(|c| c.get("sftp"))
            .cloned()
            .ok_or_else(|| {
                CommerceError::Validation(format!("vendor {} has no SFTP config", vendor.name))
            })?;
        serde_json::from_value(config)
            .map_err(|e| CommerceError::Validation(format!("bad SFTP config: {e}")))
    }

    fn receiver_id(vendor: &vendor::Model) -> String {
        vendor
            .edi_config
            .as_ref()
            .and_then(|c| c.get("receiver_id"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| vendor.code.clone())
    }

    fn po_html(po: &purchase_order::Model, items: &[purchase_order_item::Model]) -> String {
        let mut rows = String::new();
        for item in items {
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>${}</td><td>${}</td></tr>",
                item.product_name,
                item.vendor_sku.as_deref().unwrap_or("-"),
                item.qty,
                item.cost_per_box,
                item.subtotal,
            ));
        }
        format!(
            "<h1>Purchase Order {}</h1>\
             <p>Revision {}</p>\
             <table><tr><th>Product</th><th>SKU</th><th>Qty</th><th>Cost/box</th><th>Subtotal</th></tr>{}</table>\
             <p>Total: ${}</p>",
            po.po_number,
            po.revision + 1,
            rows,
            po.subtotal,
        )
    }
}

#[async_trait]
impl PoDispatch for PoDispatcher {
    async fn send_edi(
        &self,
        po: &purchase_order::Model,
        items: &[purchase_order_item::Model],
        vendor: &vendor::Model,
    ) -> CommerceResult<EdiDispatchReceipt> {
        let config = Self::sftp_config(vendor)?;
        let document = Po850 {
            po_number: po.po_number.clone(),
            revision: po.revision + 1,
            sender_id: SENDER_ID.to_string(),
            receiver_id: Self::receiver_id(vendor),
            lines: items
                .iter()
                .map(|item| Po850Line {
                    vendor_sku: item
                        .vendor_sku
                        .clone()
                        .unwrap_or_else(|| item.product_name.clone()),
                    qty: item.qty,
                    unit_cost: item.cost_per_box.to_string(),
                    description: item.product_name.clone(),
                })
                .collect(),
        };

        let icn = self.counter.next();
        let contents = generate_850(&document, icn, Utc::now());
        let file_name = file_name_850(&po.po_number, icn);

        let upload_name = file_name.clone();
        tokio::task::spawn_blocking(move || {
            let transport = SftpTransport::new(config);
            transport.upload(&upload_name, &contents)
        })
        .await
        .map_err(|e| CommerceError::Gateway(format!("SFTP task failed: {e}")))?
        .map_err(|e| CommerceError::Gateway(e.to_string()))?;

        Ok(EdiDispatchReceipt {
            interchange_control_number: icn,
            file_name,
        })
    }

    async fn send_email(
        &self,
        po: &purchase_order::Model,
        items: &[purchase_order_item::Model],
        vendor_email: &str,
    ) -> CommerceResult<()> {
        let html = Self::po_html(po, items);
        let body = match self.pdf.render(&html).await {
            Some(_pdf) => format!(
                "Please find purchase order {} attached.\n\n{html}",
                po.po_number
            ),
            // headless browser unavailable: the HTML itself is the document
            None => html,
        };
        self.email
            .send(
                vendor_email,
                &format!("Purchase Order {}", po.po_number),
                body,
            )
            .await
            .map_err(|e| CommerceError::Gateway(e.to_string()))
    }
}
