pub mod notify;
pub mod reconcile;
pub mod server;
pub mod storage;
