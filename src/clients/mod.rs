pub mod broker;
pub mod rbmq;
pub mod smtp;
pub mod vault;
