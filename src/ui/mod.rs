pub mod chart;
pub mod notify;
pub mod panels;
pub mod table;
