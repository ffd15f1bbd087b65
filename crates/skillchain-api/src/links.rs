//! Shareable link derivation.
//!
//! A share is reachable at `{public_origin}/verify/{share_id}`. The QR code
//! link points an image service at that URL:
//!
//! ```text
//! {qr_endpoint}?size={n}x{n}&data={percent-encoded verification URL}
//! ```
//!
//! Links are derived on read and never stored, so changing the public
//! origin re-targets every existing share.

use skillchain_core::ShareId;
use url::form_urlencoded;

/// Default public QR image service.
pub const DEFAULT_QR_SERVICE_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// Default QR image edge length in pixels.
pub const DEFAULT_QR_SIZE: u32 = 400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    origin: String,
    qr_endpoint: String,
    qr_size: u32,
}

impl LinkBuilder {
    /// `origin` may carry a trailing slash; it is dropped.
    pub fn new(origin: &str, qr_endpoint: &str, qr_size: u32) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            qr_endpoint: qr_endpoint.to_string(),
            qr_size,
        }
    }

    pub fn verification_url(&self, share_id: &ShareId) -> String {
        format!("{}/verify/{}", self.origin, share_id)
    }

    pub fn qr_code_url(&self, share_id: &ShareId) -> String {
        let data: String =
            form_urlencoded::byte_serialize(self.verification_url(share_id).as_bytes()).collect();
        let separator = if self.qr_endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}size={n}x{n}&data={data}",
            self.qr_endpoint,
            n = self.qr_size
        )
    }
}
