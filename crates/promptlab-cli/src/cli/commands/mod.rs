pub mod run;
pub mod runs;
pub mod show;
pub mod validate;
