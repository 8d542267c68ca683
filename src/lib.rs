//! 多租户健身房平台的访问控制服务
//! 认证、角色授权与健身房范围绑定

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
pub mod tenancy;
