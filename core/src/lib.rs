pub mod audit;
pub mod compliance;
pub mod config;
pub mod determinism;
pub mod header;
pub mod policy;
pub mod resolve;
pub mod run;
pub mod traceability;
pub mod validator;
pub mod vocabulary;

pub mod error;
