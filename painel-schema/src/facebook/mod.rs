mod account;
mod error;
mod insights;

pub use account::FacebookAdAccount;
pub use error::{FacebookErrorBody, FacebookErrorObject};
pub use insights::{FacebookCursors, FacebookInsightRow, FacebookInsightsResponse, FacebookPaging};
