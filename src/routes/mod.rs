// Route exports
pub mod mmf;

use actix_web::web;
use crate::services::PoolQuery;

pub fn configure_routes<Q: PoolQuery + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(mmf::configure::<Q>),
    );
}
