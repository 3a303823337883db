mod client;

pub use client::BackendClient;
