pub mod presenter;
pub mod rest;
