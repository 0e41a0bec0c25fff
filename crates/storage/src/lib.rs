#![forbid(unsafe_code)]

pub mod repository;
pub mod seeder;
pub mod sqlite;
