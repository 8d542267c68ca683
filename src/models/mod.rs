//! 数据模型模块

pub mod lookup;
pub mod notification;
pub mod role;
pub mod trainer;
