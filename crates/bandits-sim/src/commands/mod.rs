pub mod history;
pub mod run;
pub mod suggest;
