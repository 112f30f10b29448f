pub mod experiment;
pub mod ncfile;
pub mod variable;
