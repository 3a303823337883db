pub mod tracking_api;
