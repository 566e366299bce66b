pub mod migrate;
pub mod inspect;
