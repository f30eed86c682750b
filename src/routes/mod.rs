pub mod coffees;

use actix_web::web;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/coffees").configure(coffees::create_routes));
}
