mod error;
mod sales;

pub use error::HotmartErrorBody;
pub use sales::{
    HotmartPageInfo, HotmartPayment, HotmartPrice, HotmartProduct, HotmartPurchase, HotmartSale,
    HotmartSalesHistory,
};
