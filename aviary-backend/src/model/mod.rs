pub mod catalog;

pub use catalog::{slugify, Catalog, CatalogEntry, CatalogError, Category};
