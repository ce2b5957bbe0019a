pub mod inhibitors;
