pub mod controller;
pub mod extract;
pub mod routes;
