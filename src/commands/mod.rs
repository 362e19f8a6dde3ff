pub mod evaluate;
pub mod generate;
pub mod resolve;

pub use evaluate::run_evaluate;
pub use generate::run_generate;
pub use resolve::run_resolve;
