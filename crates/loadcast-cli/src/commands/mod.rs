pub mod collect;
pub mod recommend;
pub mod report;
pub mod transfer;
