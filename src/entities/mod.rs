pub mod consumer;
pub mod farmer;
pub mod order;
pub mod product;
pub mod product_preference;

pub mod prelude {
    pub use super::consumer::{Entity as Consumer, Model as ConsumerModel};
    pub use super::farmer::{Entity as Farmer, Model as FarmerModel};
    pub use super::order::{Entity as Order, Model as OrderModel};
    pub use super::product::{Entity as Product, Model as ProductModel};
    pub use super::product_preference::{Entity as ProductPreference, Model as ProductPreferenceModel};
}
