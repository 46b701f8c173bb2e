pub mod app;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod observe;
pub mod runtime;
pub mod serve;
pub mod tools;
