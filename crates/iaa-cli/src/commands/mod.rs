pub mod align;
pub mod inspect;
pub mod study;
