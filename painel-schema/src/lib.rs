//! Wire schemas for the remote platform APIs consumed by the `painel` adapters.
//!
//! Every numeric field that a platform may omit is an `Option`, so the adapters can tell a
//! missing value apart from a real zero.

pub mod amount;
pub mod facebook;
pub mod hotmart;
pub mod mercadopago;
pub mod perfectpay;

pub use facebook::{FacebookAdAccount, FacebookErrorBody, FacebookInsightsResponse};
pub use hotmart::{HotmartErrorBody, HotmartSalesHistory};
pub use mercadopago::{MercadoPagoErrorBody, MercadoPagoPaymentSearch, MercadoPagoUser};
pub use perfectpay::{PerfectPayErrorBody, PerfectPaySalesPage, PerfectPaySalesQuery};
