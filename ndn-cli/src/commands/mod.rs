pub mod interest;
pub mod publish;
pub mod register;
