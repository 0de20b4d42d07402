pub mod app_config;
pub mod audit;
pub mod db;
pub mod flash;
pub mod ip;
pub mod middleware;
pub mod orm;
pub mod session;
pub mod storage;
pub mod template;
pub mod web;
