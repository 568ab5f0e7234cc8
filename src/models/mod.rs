pub mod block;
pub mod credential;
pub mod did;
