pub mod accounts;
pub mod catalog;
pub mod certificate;
pub mod orders;
pub mod products;
pub mod qr_binder;
