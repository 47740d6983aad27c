mod product;

pub use product::{validate_name, validate_price, Product, ProductChanges, SyncStatus};
