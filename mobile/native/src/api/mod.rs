pub mod connection;
pub mod settings;
pub mod voice;
