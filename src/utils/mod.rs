pub mod store_access;
