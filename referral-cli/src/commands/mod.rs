pub mod replay;
pub mod route;
