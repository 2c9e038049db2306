pub mod context;
pub mod fragment;
pub mod interest;
pub mod outcome;
pub mod turn;
