pub mod cache;
pub mod observer;
pub mod reconciler;
pub mod remote;
