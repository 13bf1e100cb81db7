pub mod db;
pub mod drive;
pub mod nginx;
