pub mod analytics;
pub mod auth;
pub mod companies;
pub mod core;
pub mod data;
pub mod export;
pub mod nav;
pub mod plans;
pub mod records;
pub mod search;
pub mod seed;
pub mod survey;
