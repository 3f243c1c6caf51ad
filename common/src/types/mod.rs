pub mod answer;
pub mod message;
