pub mod alarm;
pub mod config;
pub mod history;
pub mod run;
