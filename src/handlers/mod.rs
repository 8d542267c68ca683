//! HTTP 处理器模块

pub mod health;
pub mod lookup;
pub mod me;
pub mod notification;
pub mod role;
pub mod trainer;
