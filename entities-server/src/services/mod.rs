pub mod backup_runner;
pub mod backup_scheduler;
pub mod db_snapshot;
