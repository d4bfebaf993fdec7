pub mod build;
pub mod fetch;
pub mod info;
pub mod point;
pub mod search;
