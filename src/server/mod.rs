pub mod guards;
pub mod router;
pub mod routes;

pub use router::{PainelState, painel_router};
