pub mod accounts;
pub mod audit;
pub mod item_service;
pub mod membership;
pub mod quota;
pub mod settings;
pub mod storage;
pub mod worker;
