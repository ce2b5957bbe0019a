pub mod collectors;
